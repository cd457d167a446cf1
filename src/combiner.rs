//! XOR combiner and outbound emitter.
//!
//! Ciphertext byte `i` is `plaintext[i] ^ keystream[i]`, produced on demand in
//! strictly ascending order. Byte 0 is presented before the emission loop
//! starts; each later byte is prepared only after the link has accepted the
//! previous one.

use crate::keystream::KeystreamBuffer;
use crate::{Block, BLOCK_SIZE};

/// Result of an accepted outbound handshake
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emission {
    /// The next byte is now presented at this index.
    Next(usize),
    /// Byte 63 was accepted; the block is complete.
    BlockDone,
}

/// Outbound ciphertext stream for one block at a time
#[derive(Debug, Default)]
pub struct XorCombiner {
    tx_index: usize,
    presented: Option<u8>,
}

#[inline]
fn combine(plaintext: &Block, keystream: &KeystreamBuffer, index: usize) -> u8 {
    plaintext[index] ^ keystream.byte(index)
}

impl XorCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the transmit index and presents ciphertext byte 0.
    pub fn prepare(&mut self, plaintext: &Block, keystream: &KeystreamBuffer) {
        self.tx_index = 0;
        self.presented = Some(combine(plaintext, keystream, 0));
    }

    /// Byte currently marked valid on the outbound side.
    pub fn presented(&self) -> Option<u8> {
        self.presented
    }

    pub fn tx_index(&self) -> usize {
        self.tx_index
    }

    /// Called after the link accepted the presented byte.
    pub fn accepted(&mut self, plaintext: &Block, keystream: &KeystreamBuffer) -> Emission {
        if self.tx_index == BLOCK_SIZE - 1 {
            self.tx_index = 0;
            self.presented = None;
            return Emission::BlockDone;
        }
        self.tx_index += 1;
        self.presented = Some(combine(plaintext, keystream, self.tx_index));
        Emission::Next(self.tx_index)
    }

    /// Drops whatever is presented.
    pub fn idle(&mut self) {
        self.tx_index = 0;
        self.presented = None;
    }
}
