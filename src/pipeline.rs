//! Link and controller wired together, one tick at a time.

use crate::channel::SerialLink;
use crate::config::ChannelConfig;
use crate::controller::{BlockController, TickOutput};
use crate::engine::BlockEngine;
use crate::error::{ChannelError, Result};
use crate::{Block, BLOCK_SIZE};

/// A block controller driven by a scripted serial link
pub struct Pipeline<E: BlockEngine> {
    controller: BlockController<E>,
    link: SerialLink,
}

impl<E: BlockEngine> Pipeline<E> {
    pub fn new(config: ChannelConfig, engine: E) -> Result<Self> {
        Self::with_link(config, engine, SerialLink::new())
    }

    pub fn with_link(config: ChannelConfig, engine: E, link: SerialLink) -> Result<Self> {
        Ok(Self {
            controller: BlockController::new(config, engine)?,
            link,
        })
    }

    pub fn controller(&self) -> &BlockController<E> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut BlockController<E> {
        &mut self.controller
    }

    pub fn link(&self) -> &SerialLink {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut SerialLink {
        &mut self.link
    }

    /// Queues host bytes on the inbound side.
    pub fn send(&mut self, bytes: &[u8]) {
        self.link.send(bytes);
    }

    /// Runs one tick on both sides of the link.
    pub fn tick(&mut self) -> Result<TickOutput> {
        let input = self.link.sample();
        match self.controller.step(input) {
            Ok(output) => {
                self.link.complete(&output);
                Ok(output)
            }
            Err(err) => {
                self.link.skip();
                Err(err)
            }
        }
    }

    /// Runs `ticks` ticks, stopping at the first error.
    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Runs until `done` holds or `max_ticks` have elapsed. Returns whether
    /// `done` was reached.
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        mut done: impl FnMut(&Self) -> bool,
    ) -> Result<bool> {
        for _ in 0..max_ticks {
            if done(&*self) {
                return Ok(true);
            }
            self.tick()?;
        }
        Ok(done(&*self))
    }

    /// Sends one block and waits for its 64 ciphertext bytes, the way a
    /// well-behaved host does before sending the next block.
    pub fn exchange(&mut self, block: &Block, max_ticks: u64) -> Result<Block> {
        let start = self.link.received().len();
        self.send(block);

        let mut ticks = 0;
        while self.link.received().len() - start < BLOCK_SIZE {
            if ticks == max_ticks {
                return Err(ChannelError::IncompleteExchange {
                    received: self.link.received().len() - start,
                    ticks,
                });
            }
            self.tick()?;
            ticks += 1;
        }

        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&self.link.received()[start..start + BLOCK_SIZE]);
        Ok(out)
    }

    /// Splits everything received so far into positional 64-byte blocks,
    /// leaving a trailing partial block in place.
    pub fn take_blocks(&mut self) -> Vec<Block> {
        let received = self.link.take_received();
        let mut chunks = received.chunks_exact(BLOCK_SIZE);
        let blocks = chunks
            .by_ref()
            .map(|chunk| {
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(chunk);
                block
            })
            .collect();
        let rest = chunks.remainder().to_vec();
        if !rest.is_empty() {
            self.link.restore_received(rest);
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ReadyPolicy;
    use crate::engine::SoftEngine;

    #[test]
    fn exchange_returns_ciphertext() {
        let mut pipeline = Pipeline::new(ChannelConfig::default(), SoftEngine::new(2)).unwrap();
        let ct = pipeline.exchange(&[0u8; BLOCK_SIZE], 1_000).unwrap();
        assert_eq!(&ct[..4], &[0x76, 0xb8, 0xe0, 0xad]);
        assert_eq!(pipeline.controller().counter(), 1);
    }

    #[test]
    fn exchange_times_out_when_link_never_ready() {
        let link = SerialLink::new().with_ready_policy(ReadyPolicy::Never);
        let mut pipeline =
            Pipeline::with_link(ChannelConfig::default(), SoftEngine::new(0), link).unwrap();
        let err = pipeline.exchange(&[0u8; BLOCK_SIZE], 500).unwrap_err();
        assert_eq!(
            err,
            ChannelError::IncompleteExchange {
                received: 0,
                ticks: 500
            }
        );
    }

    #[test]
    fn take_blocks_keeps_partial_tail() {
        let mut pipeline = Pipeline::new(ChannelConfig::default(), SoftEngine::new(0)).unwrap();
        pipeline.send(&[0u8; BLOCK_SIZE]);
        let reached = pipeline
            .run_until(1_000, |p| p.link().received().len() == 10)
            .unwrap();
        assert!(reached);

        assert!(pipeline.take_blocks().is_empty());
        assert_eq!(pipeline.link().received().len(), 10);

        pipeline
            .run_until(1_000, |p| p.controller().blocks_completed() == 1)
            .unwrap();
        let blocks = pipeline.take_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0][0], 0x76);
    }
}
