//! Scripted serial link.
//!
//! Stands in for the byte-level transport: it offers queued host bytes on the
//! inbound side (one per tick, optionally spaced out) and collects whatever
//! the core transfers on the outbound side. Framing is purely positional, so
//! a dropped or duplicated byte shifts every later block.

use crate::controller::{TickInput, TickOutput};
use std::collections::VecDeque;

/// When the link asserts outbound ready
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ReadyPolicy {
    #[default]
    Always,
    Never,
    /// Ready on every `n`th tick.
    EveryNth(u32),
    /// Cycles through the given pattern, one entry per tick.
    Pattern(Vec<bool>),
}

impl ReadyPolicy {
    fn is_ready(&self, tick: u64) -> bool {
        match self {
            ReadyPolicy::Always => true,
            ReadyPolicy::Never => false,
            ReadyPolicy::EveryNth(0) => false,
            ReadyPolicy::EveryNth(n) => tick % u64::from(*n) == 0,
            ReadyPolicy::Pattern(pattern) if pattern.is_empty() => false,
            ReadyPolicy::Pattern(pattern) => pattern[(tick % pattern.len() as u64) as usize],
        }
    }
}

/// Byte-stream link with valid/ready handshakes in both directions
#[derive(Debug, Default)]
pub struct SerialLink {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    ready: ReadyPolicy,
    /// Idle ticks between consecutive inbound bytes
    rx_gap: u32,
    gap_left: u32,
    tick: u64,
}

impl SerialLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ready_policy(mut self, ready: ReadyPolicy) -> Self {
        self.ready = ready;
        self
    }

    pub fn with_rx_gap(mut self, gap: u32) -> Self {
        self.rx_gap = gap;
        self
    }

    pub fn set_ready_policy(&mut self, ready: ReadyPolicy) {
        self.ready = ready;
    }

    /// Queues host bytes for the inbound side.
    pub fn send(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Inbound bytes not yet offered to the core.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn received(&self) -> &[u8] {
        &self.outbound
    }

    pub fn take_received(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Puts back bytes that were taken but not consumed.
    pub fn restore_received(&mut self, mut bytes: Vec<u8>) {
        bytes.append(&mut self.outbound);
        self.outbound = bytes;
    }

    /// Drives the link side of one tick.
    pub fn sample(&mut self) -> TickInput {
        let rx = if self.gap_left > 0 {
            self.gap_left -= 1;
            None
        } else {
            let byte = self.inbound.pop_front();
            if byte.is_some() {
                self.gap_left = self.rx_gap;
            }
            byte
        };
        TickInput {
            rx,
            tx_ready: self.ready.is_ready(self.tick),
        }
    }

    /// Records the outbound transfer of a tick and moves to the next one.
    pub fn complete(&mut self, output: &TickOutput) {
        if let Some(byte) = output.tx {
            self.outbound.push(byte);
        }
        self.tick += 1;
    }

    /// Advances one tick in which the core did not run.
    pub fn skip(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Phase;

    #[test]
    fn inbound_bytes_spaced_by_gap() {
        let mut link = SerialLink::new().with_rx_gap(2);
        link.send(&[1, 2]);
        let seen: Vec<Option<u8>> = (0..5)
            .map(|_| {
                let input = link.sample();
                link.skip();
                input.rx
            })
            .collect();
        assert_eq!(seen, vec![Some(1), None, None, Some(2), None]);
    }

    #[test]
    fn ready_policies() {
        assert!(ReadyPolicy::Always.is_ready(3));
        assert!(!ReadyPolicy::Never.is_ready(0));
        assert!(ReadyPolicy::EveryNth(3).is_ready(6));
        assert!(!ReadyPolicy::EveryNth(3).is_ready(7));
        let pattern = ReadyPolicy::Pattern(vec![true, false]);
        assert!(pattern.is_ready(2));
        assert!(!pattern.is_ready(3));
    }

    #[test]
    fn complete_collects_outbound() {
        let mut link = SerialLink::new();
        link.complete(&TickOutput {
            tx: Some(9),
            phase: Phase::Emit,
            completed: None,
        });
        assert_eq!(link.received(), &[9]);
        assert_eq!(link.take_received(), vec![9]);
        assert!(link.received().is_empty());
    }
}
