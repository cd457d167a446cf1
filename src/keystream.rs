//! Keystream materialization.
//!
//! The engine output bus is unpacked in one batch: most-significant word
//! first, big-endian within each word. Index 0 of the buffer pairs with
//! plaintext byte 0.

use crate::engine::Keystream;
use crate::BLOCK_SIZE;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Per-block keystream bytes, read-only while a block is being emitted
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeystreamBuffer {
    bytes: [u8; BLOCK_SIZE],
    loaded: bool,
}

impl KeystreamBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; BLOCK_SIZE],
            loaded: false,
        }
    }

    /// Replaces the whole buffer with the unpacked engine output.
    pub fn load(&mut self, keystream: &Keystream) {
        for (chunk, word) in self.bytes.chunks_exact_mut(8).zip(keystream.words()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    pub fn byte(&self, index: usize) -> u8 {
        self.bytes[index]
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    /// Retires the block's keystream.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
        self.loaded = false;
    }
}

impl Default for KeystreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}
