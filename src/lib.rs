//! Tick-driven ChaCha block channel processor.
//!
//! Plaintext arrives one byte at a time over a serial link, is assembled into
//! 64-byte blocks, combined with one ChaCha keystream block per block counter
//! value, and streamed back as ciphertext over the same link. The
//! [`BlockController`] advances in discrete ticks; every component sees the
//! state captured at the start of a tick.
//!
//! The crate also ships a `cipher`-compatible reference implementation
//! ([`ChaCha20Link`] and friends) used by the [`Verifier`] to check emitted
//! ciphertext independently of the [`BlockEngine`] under test.
//!
//! ```
//! use chacha_link::{ChannelConfig, Pipeline, SoftEngine};
//!
//! let config = ChannelConfig::default();
//! let mut pipeline = Pipeline::new(config.clone(), SoftEngine::new(4)).unwrap();
//! let plaintext = [0u8; 64];
//! let ciphertext = pipeline.exchange(&plaintext, 10_000).unwrap();
//! assert_eq!(ciphertext[0], 0x76);
//! ```

pub use cipher; // Re-export cipher crate for downstream users

pub mod assembler;
pub mod channel;
pub mod combiner;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod keystream;
pub mod pipeline;
pub mod verify;

// --- Core Cipher Logic ---

pub(crate) mod core;

// --- Software Backend ---
pub(crate) mod backends;

pub use crate::assembler::{Accept, BlockAssembler, SlotId};
pub use crate::channel::{ReadyPolicy, SerialLink};
pub use crate::combiner::{Emission, XorCombiner};
pub use crate::config::{Buffering, ChannelConfig, ChannelConfigBuilder};
pub use crate::controller::{BlockController, Phase, TickInput, TickOutput};
pub use crate::core::ChaChaCore;
pub use crate::engine::{BlockEngine, CipherParams, Keystream, SoftEngine};
pub use crate::error::{ChannelError, Result};
pub use crate::keystream::KeystreamBuffer;
pub use crate::pipeline::Pipeline;
pub use crate::verify::{BlockReport, ByteDiff, Verifier};

// --- Round Count Abstraction ---

/// A trait to define the round count of a reference ChaCha variant.
pub trait ChaChaVariant: Clone {
    const ROUNDS: u8;
}

/// ChaCha with 8 rounds.
#[derive(Clone)]
pub struct Rounds8;
impl ChaChaVariant for Rounds8 {
    const ROUNDS: u8 = 8;
}

/// ChaCha with 12 rounds.
#[derive(Clone)]
pub struct Rounds12;
impl ChaChaVariant for Rounds12 {
    const ROUNDS: u8 = 12;
}

/// ChaCha with 20 rounds.
#[derive(Clone)]
pub struct Rounds20;
impl ChaChaVariant for Rounds20 {
    const ROUNDS: u8 = 20;
}

// --- Constants ---

/// Bytes per block in each direction on the wire.
pub const BLOCK_SIZE: usize = 64;
/// Key length in bytes (256 bits).
pub const KEY_SIZE: usize = 32;
/// Nonce length in bytes (64 bits).
pub const NONCE_SIZE: usize = 8;

const STATE_WORDS: usize = 16;
/// "expand 32-byte k"
const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// One plaintext or ciphertext block.
pub type Block = [u8; BLOCK_SIZE];

// --- Convenience Type Aliases for Users ---
pub type ChaCha8Link = cipher::StreamCipherCoreWrapper<ChaChaCore<Rounds8>>;
pub type ChaCha12Link = cipher::StreamCipherCoreWrapper<ChaChaCore<Rounds12>>;
pub type ChaCha20Link = cipher::StreamCipherCoreWrapper<ChaChaCore<Rounds20>>;

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::{ChaCha12Link, ChaCha20Link};
    use cipher::{KeyIvInit, StreamCipher};

    #[test]
    fn test_chacha20_encryption_decryption() {
        let key = [0x01; 32];
        let nonce = [0x02; 8];
        let mut plaintext = *b"This is a test message for the ChaCha20 link cipher.";
        let original_plaintext = plaintext;
        let mut cipher = ChaCha20Link::new(&key.into(), &nonce.into());
        cipher.apply_keystream(&mut plaintext);
        assert_ne!(original_plaintext, plaintext);
        let mut cipher = ChaCha20Link::new(&key.into(), &nonce.into());
        cipher.apply_keystream(&mut plaintext);
        assert_eq!(original_plaintext, plaintext);
    }

    #[test]
    fn test_chacha12_keystream_generation() {
        let key = [0x03; 32];
        let nonce = [0x04; 8];
        let mut data1 = [0u8; 128];
        let mut data2 = [0u8; 128];
        let mut cipher1 = ChaCha12Link::new(&key.into(), &nonce.into());
        cipher1.apply_keystream(&mut data1);
        let mut cipher2 = ChaCha12Link::new(&key.into(), &nonce.into());
        cipher2.apply_keystream(&mut data2[..64]);
        assert_eq!(data1[..64], data2[..64]);
        assert_ne!(data1[..64], data1[64..]);
    }
}
