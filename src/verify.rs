//! Verification against the reference cipher.
//!
//! The verifier never looks at the engine under test. It recomputes every
//! block through the `cipher`-trait reference implementation, seeking the
//! stream to the block counter, and reports a byte-indexed diff.

use crate::config::ChannelConfig;
use crate::core::ChaChaCore;
use crate::error::{ChannelError, Result};
use crate::{
    Block, ChaChaVariant, Rounds12, Rounds20, Rounds8, BLOCK_SIZE, KEY_SIZE, NONCE_SIZE,
};
use cipher::{KeyIvInit, StreamCipher, StreamCipherCoreWrapper, StreamCipherSeekCore};
use core::fmt;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One mismatching byte
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteDiff {
    pub index: usize,
    pub expected: u8,
    /// `None` when the core emitted nothing at this position.
    pub actual: Option<u8>,
}

/// Pass/fail result for one block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    pub counter: u64,
    pub diffs: Vec<ByteDiff>,
}

impl BlockReport {
    pub fn passed(&self) -> bool {
        self.diffs.is_empty()
    }
}

impl fmt::Display for BlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "block {}: PASS", self.counter);
        }
        write!(
            f,
            "block {}: FAIL ({} of {} bytes differ)",
            self.counter,
            self.diffs.len(),
            BLOCK_SIZE
        )?;
        for diff in &self.diffs {
            match diff.actual {
                Some(actual) => write!(
                    f,
                    "\n  [{:02}] expected {:02x} got {:02x}",
                    diff.index, diff.expected, actual
                )?,
                None => write!(
                    f,
                    "\n  [{:02}] expected {:02x} got nothing",
                    diff.index, diff.expected
                )?,
            }
        }
        Ok(())
    }
}

/// Reference-model checker for emitted ciphertext
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Verifier {
    key: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
    rounds: u8,
}

impl Verifier {
    /// Fails if the reference cipher has no variant for the configured rounds.
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        match config.rounds {
            8 | 12 | 20 => Ok(Self {
                key: config.key,
                nonce: config.nonce,
                rounds: config.rounds,
            }),
            rounds => Err(ChannelError::UnsupportedReferenceRounds { rounds }),
        }
    }

    /// Expected ciphertext for `plaintext` encrypted as block `counter`.
    pub fn expected(&self, counter: u64, plaintext: &Block) -> Result<Block> {
        let mut block = *plaintext;
        match self.rounds {
            8 => self.apply::<Rounds8>(counter, &mut block),
            12 => self.apply::<Rounds12>(counter, &mut block),
            20 => self.apply::<Rounds20>(counter, &mut block),
            rounds => return Err(ChannelError::UnsupportedReferenceRounds { rounds }),
        }
        Ok(block)
    }

    fn apply<V: ChaChaVariant>(&self, counter: u64, block: &mut Block) {
        let mut reference = ChaChaCore::<V>::new(&self.key.into(), &self.nonce.into());
        reference.set_block_pos(counter);
        let mut cipher = StreamCipherCoreWrapper::from_core(reference);
        cipher.apply_keystream(block);
    }

    /// Compares one emitted block against the reference.
    pub fn check(
        &self,
        counter: u64,
        plaintext: &Block,
        ciphertext: &[u8],
    ) -> Result<BlockReport> {
        let expected = self.expected(counter, plaintext)?;
        let diffs = expected
            .iter()
            .enumerate()
            .filter_map(|(index, &expected)| {
                let actual = ciphertext.get(index).copied();
                (actual != Some(expected)).then_some(ByteDiff {
                    index,
                    expected,
                    actual,
                })
            })
            .collect();

        let report = BlockReport { counter, diffs };
        if report.passed() {
            info!(counter, "Block verified");
        } else {
            warn!(counter, mismatches = report.diffs.len(), "Block mismatch");
        }
        Ok(report)
    }

    /// Checks a positional stream of blocks starting at `first_counter`.
    ///
    /// One report is produced per full plaintext block; missing ciphertext
    /// shows up as `actual: None`.
    pub fn check_stream(
        &self,
        first_counter: u64,
        plaintext: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<BlockReport>> {
        plaintext
            .chunks_exact(BLOCK_SIZE)
            .enumerate()
            .map(|(i, chunk)| {
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(chunk);
                let offset = i * BLOCK_SIZE;
                let emitted = ciphertext.get(offset..).unwrap_or(&[]);
                let emitted = &emitted[..emitted.len().min(BLOCK_SIZE)];
                self.check(first_counter.wrapping_add(i as u64), &block, emitted)
            })
            .collect()
    }
}
