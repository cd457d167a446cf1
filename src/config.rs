//! Channel configuration and validation
//!
//! Key and nonce are fixed for the lifetime of a channel; only the block
//! counter varies from block to block.
//!
//! # Example
//!
//! ```
//! use chacha_link::{Buffering, ChannelConfigBuilder};
//!
//! let config = ChannelConfigBuilder::new()
//!     .key([0x11; 32])
//!     .nonce([0x22; 8])
//!     .rounds(12)
//!     .engine_timeout(Some(256))
//!     .buffering(Buffering::Double)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.rounds, 12);
//! ```

use crate::error::{ChannelError, Result};
use crate::{KEY_SIZE, NONCE_SIZE};
use core::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default bound on the WAIT_ENGINE phase, in ticks.
pub const DEFAULT_ENGINE_TIMEOUT_TICKS: u64 = 4096;

/// Plaintext buffering discipline of the block assembler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Buffering {
    /// One shared slot. Inbound bytes that arrive while a block is in flight
    /// are dropped, so back-to-back senders lose block alignment.
    Single,
    /// Two alternating slots. The assembler only writes to the slot the
    /// combiner does not own.
    #[default]
    Double,
}

/// Channel configuration
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelConfig {
    /// 256-bit cipher key
    pub key: [u8; KEY_SIZE],
    /// 64-bit cipher nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Cipher round count (even, non-zero)
    pub rounds: u8,
    /// Counter value of the first block after start or reset
    pub initial_counter: u64,
    /// Bound on the engine wait in ticks; `None` waits forever
    pub engine_timeout: Option<u64>,
    /// Plaintext buffering discipline
    #[zeroize(skip)]
    pub buffering: Buffering,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            key: [0u8; KEY_SIZE],
            nonce: [0u8; NONCE_SIZE],
            rounds: 20,
            initial_counter: 0,
            engine_timeout: Some(DEFAULT_ENGINE_TIMEOUT_TICKS),
            buffering: Buffering::Double,
        }
    }
}

impl ChannelConfig {
    /// Check round count and timeout bounds
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 || self.rounds % 2 != 0 {
            return Err(ChannelError::InvalidRounds {
                rounds: self.rounds,
            });
        }
        if self.engine_timeout == Some(0) {
            return Err(ChannelError::InvalidTimeout);
        }
        Ok(())
    }
}

// Keeps key material out of logs.
impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("key", &"<redacted>")
            .field("nonce", &self.nonce)
            .field("rounds", &self.rounds)
            .field("initial_counter", &self.initial_counter)
            .field("engine_timeout", &self.engine_timeout)
            .field("buffering", &self.buffering)
            .finish()
    }
}

/// Builder for [`ChannelConfig`]
#[derive(Default)]
pub struct ChannelConfigBuilder {
    config: ChannelConfig,
}

impl ChannelConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: [u8; KEY_SIZE]) -> Self {
        self.config.key = key;
        self
    }

    pub fn nonce(mut self, nonce: [u8; NONCE_SIZE]) -> Self {
        self.config.nonce = nonce;
        self
    }

    pub fn rounds(mut self, rounds: u8) -> Self {
        self.config.rounds = rounds;
        self
    }

    pub fn initial_counter(mut self, counter: u64) -> Self {
        self.config.initial_counter = counter;
        self
    }

    pub fn engine_timeout(mut self, ticks: Option<u64>) -> Self {
        self.config.engine_timeout = ticks;
        self
    }

    pub fn buffering(mut self, buffering: Buffering) -> Self {
        self.config.buffering = buffering;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<ChannelConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
