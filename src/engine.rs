//! Cipher block engine interface.
//!
//! The engine is an external collaborator: it accepts an init pulse carrying
//! `{key, nonce, counter, rounds}` while it reports ready, and asserts
//! output-valid exactly once per pulse with the matching 512-bit keystream.

use crate::backends::soft;
use crate::error::{ChannelError, Result};
use crate::{BLOCK_SIZE, KEY_SIZE, NONCE_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of 64-bit words in one keystream output.
pub const KEYSTREAM_WORDS: usize = 8;

/// Per-block cipher parameters presented with an init pulse
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherParams {
    pub key: [u8; KEY_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub counter: u64,
    pub rounds: u8,
}

/// 512-bit engine output.
///
/// Word 0 is the most significant word of the output bus. Unpacking the
/// words in order, each big-endian, yields the keystream bytes in wire order.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Keystream(pub [u64; KEYSTREAM_WORDS]);

impl Keystream {
    /// Packs serialized keystream bytes onto the output bus layout.
    pub fn from_bytes(bytes: &[u8; BLOCK_SIZE]) -> Self {
        let mut words = [0u64; KEYSTREAM_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut be = [0u8; 8];
            be.copy_from_slice(chunk);
            *word = u64::from_be_bytes(be);
        }
        Self(words)
    }

    pub fn words(&self) -> &[u64; KEYSTREAM_WORDS] {
        &self.0
    }
}

impl core::fmt::Debug for Keystream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Keystream(<redacted>)")
    }
}

/// Handshake-level contract of a cipher block engine.
pub trait BlockEngine {
    /// True when the engine will accept an init pulse.
    fn is_ready(&self) -> bool;

    /// Init pulse: start computing the keystream for `params`.
    fn init(&mut self, params: &CipherParams) -> Result<()>;

    /// Advances the engine by one tick. Returns the keystream on the single
    /// tick where output-valid is asserted for the current pulse.
    fn poll(&mut self) -> Option<Keystream>;

    /// Abandons the in-flight computation, if any.
    fn cancel(&mut self);
}

struct Job {
    keystream: Keystream,
    remaining: u32,
}

/// Software engine computing the ChaCha block function with a fixed
/// completion latency.
pub struct SoftEngine {
    latency: u32,
    job: Option<Job>,
}

impl SoftEngine {
    /// `latency` is the number of polls that return nothing before output-valid.
    pub fn new(latency: u32) -> Self {
        Self { latency, job: None }
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Computes the keystream for `params` without any handshake.
    pub fn compute(params: &CipherParams) -> Keystream {
        let mut bytes =
            soft::keystream_block(&params.key, &params.nonce, params.counter, params.rounds);
        let keystream = Keystream::from_bytes(&bytes);
        bytes.zeroize();
        keystream
    }
}

impl Default for SoftEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BlockEngine for SoftEngine {
    fn is_ready(&self) -> bool {
        self.job.is_none()
    }

    fn init(&mut self, params: &CipherParams) -> Result<()> {
        if self.job.is_some() {
            return Err(ChannelError::EngineBusy);
        }
        self.job = Some(Job {
            keystream: Self::compute(params),
            remaining: self.latency,
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<Keystream> {
        let job = self.job.as_mut()?;
        if job.remaining > 0 {
            job.remaining -= 1;
            return None;
        }
        self.job.take().map(|job| job.keystream)
    }

    fn cancel(&mut self) {
        self.job = None;
    }
}
