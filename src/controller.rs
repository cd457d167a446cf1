//! Block controller state machine.
//!
//! The controller advances once per [`step`](BlockController::step). Every
//! guard in a step is evaluated against the state captured at the start of
//! that tick:
//!
//! ```text
//! AwaitBlock --(full block && engine ready)--> InitEngine --> WaitEngine
//! WaitEngine --(output valid)--> LoadKeystream --> PrepareTx --> Emit
//! Emit --(byte 63 accepted)--> AwaitBlock, counter += 1
//! ```
//!
//! Only one block is ever between `InitEngine` and the end of `Emit`. The
//! assembler keeps accepting inbound bytes in every phase.

use crate::assembler::{BlockAssembler, SlotId};
use crate::combiner::{Emission, XorCombiner};
use crate::config::ChannelConfig;
use crate::engine::{BlockEngine, CipherParams, Keystream};
use crate::error::{ChannelError, Result};
use crate::keystream::KeystreamBuffer;
use tracing::{debug, trace, warn};

/// Controller phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Idle, waiting for a complete plaintext block and a ready engine.
    AwaitBlock,
    /// Issuing the init pulse with the current counter.
    InitEngine,
    /// Waiting for engine output-valid.
    WaitEngine,
    /// Unpacking the engine output into the keystream buffer.
    LoadKeystream,
    /// Presenting ciphertext byte 0.
    PrepareTx,
    /// Streaming ciphertext, one byte per accepted handshake.
    Emit,
}

/// Link signals sampled for one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Inbound byte with its valid flag. The core is always ready.
    pub rx: Option<u8>,
    /// Outbound ready from the link.
    pub tx_ready: bool,
}

/// What happened during one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutput {
    /// Ciphertext byte transferred this tick (valid && ready).
    pub tx: Option<u8>,
    /// Phase for the next tick.
    pub phase: Phase,
    /// Counter of the block whose last byte was accepted this tick.
    pub completed: Option<u64>,
}

/// Sequences assembly, keystream generation and emission; owns the block counter
pub struct BlockController<E: BlockEngine> {
    config: ChannelConfig,
    engine: E,
    assembler: BlockAssembler,
    keystream: KeystreamBuffer,
    combiner: XorCombiner,
    phase: Phase,
    counter: u64,
    /// Slot owned by the block in flight
    slot: Option<SlotId>,
    /// Engine output between WaitEngine and LoadKeystream
    pending: Option<Keystream>,
    waited: u64,
    ticks: u64,
    blocks_completed: u64,
}

impl<E: BlockEngine> BlockController<E> {
    pub fn new(config: ChannelConfig, engine: E) -> Result<Self> {
        config.validate()?;
        let assembler = BlockAssembler::new(config.buffering);
        let counter = config.initial_counter;
        Ok(Self {
            config,
            engine,
            assembler,
            keystream: KeystreamBuffer::new(),
            combiner: XorCombiner::new(),
            phase: Phase::AwaitBlock,
            counter,
            slot: None,
            pending: None,
            waited: 0,
            ticks: 0,
            blocks_completed: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Counter value used for the next (or in-flight) block.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Overrides the block counter, as an external test command would.
    pub fn set_counter(&mut self, counter: u64) {
        debug!(counter, "Block counter set");
        self.counter = counter;
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn assembler(&self) -> &BlockAssembler {
        &self.assembler
    }

    /// Outbound byte currently marked valid, if any.
    pub fn presented(&self) -> Option<u8> {
        match self.phase {
            Phase::Emit => self.combiner.presented(),
            _ => None,
        }
    }

    pub fn tx_index(&self) -> usize {
        self.combiner.tx_index()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn blocks_completed(&self) -> u64 {
        self.blocks_completed
    }

    /// External reinitialization: clears buffers and indices, cancels the
    /// engine and restores the configured initial counter.
    pub fn reset(&mut self) {
        self.engine.cancel();
        self.assembler.reset();
        self.keystream.clear();
        self.combiner.idle();
        self.phase = Phase::AwaitBlock;
        self.counter = self.config.initial_counter;
        self.slot = None;
        self.pending = None;
        self.waited = 0;
        debug!(counter = self.counter, "Controller reset");
    }

    /// Advances one tick.
    ///
    /// An engine timeout is reported as `Err` after the tick has been
    /// committed; the block stays queued and is retried with the same counter.
    pub fn step(&mut self, input: TickInput) -> Result<TickOutput> {
        self.ticks += 1;

        let sent = self.presented().filter(|_| input.tx_ready);
        let from = self.phase;
        let transition = self.advance(sent.is_some());

        if let Some(byte) = input.rx {
            self.assembler.accept(byte);
        }

        let completed = transition?;
        if from != self.phase {
            trace!(from = ?from, to = ?self.phase, tick = self.ticks, "Phase transition");
        }

        Ok(TickOutput {
            tx: sent,
            phase: self.phase,
            completed,
        })
    }

    fn params(&self) -> CipherParams {
        CipherParams {
            key: self.config.key,
            nonce: self.config.nonce,
            counter: self.counter,
            rounds: self.config.rounds,
        }
    }

    fn advance(&mut self, tx_accepted: bool) -> Result<Option<u64>> {
        match self.phase {
            Phase::AwaitBlock => {
                if self.assembler.has_full_block() && self.engine.is_ready() {
                    self.slot = self.assembler.claim();
                    debug!(counter = self.counter, "Block claimed");
                    self.phase = Phase::InitEngine;
                }
            }
            Phase::InitEngine => {
                let params = self.params();
                self.engine.init(&params)?;
                self.waited = 0;
                self.phase = Phase::WaitEngine;
            }
            Phase::WaitEngine => match self.engine.poll() {
                Some(keystream) => {
                    self.pending = Some(keystream);
                    self.phase = Phase::LoadKeystream;
                }
                None => {
                    self.waited += 1;
                    if let Some(limit) = self.config.engine_timeout {
                        if self.waited >= limit {
                            return Err(self.abandon_engine_wait());
                        }
                    }
                }
            },
            Phase::LoadKeystream => {
                if let Some(keystream) = self.pending.take() {
                    self.keystream.load(&keystream);
                }
                self.phase = Phase::PrepareTx;
            }
            Phase::PrepareTx => {
                let Some(slot) = self.slot else {
                    self.phase = Phase::AwaitBlock;
                    return Ok(None);
                };
                self.combiner
                    .prepare(self.assembler.plaintext(slot), &self.keystream);
                self.phase = Phase::Emit;
            }
            Phase::Emit => {
                if !tx_accepted {
                    return Ok(None);
                }
                let Some(slot) = self.slot else {
                    self.combiner.idle();
                    self.phase = Phase::AwaitBlock;
                    return Ok(None);
                };
                let emission = self
                    .combiner
                    .accepted(self.assembler.plaintext(slot), &self.keystream);
                if emission == Emission::BlockDone {
                    return Ok(Some(self.finish_block(slot)));
                }
            }
        }
        Ok(None)
    }

    fn finish_block(&mut self, slot: SlotId) -> u64 {
        let done = self.counter;
        self.counter = self.counter.wrapping_add(1);
        self.assembler.release(slot);
        self.keystream.clear();
        self.slot = None;
        self.blocks_completed += 1;
        self.phase = Phase::AwaitBlock;
        debug!(counter = done, next = self.counter, "Block emitted");
        done
    }

    fn abandon_engine_wait(&mut self) -> ChannelError {
        let waited = self.waited;
        self.engine.cancel();
        if let Some(slot) = self.slot.take() {
            self.assembler.unclaim(slot);
        }
        self.waited = 0;
        self.phase = Phase::AwaitBlock;
        warn!(counter = self.counter, waited, "Cipher engine timed out, block requeued");
        ChannelError::EngineTimeout {
            counter: self.counter,
            waited,
        }
    }
}
