//! Error types for the block channel

use thiserror::Error;

/// Errors surfaced by the channel core and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Cipher engine did not complete block {counter} within {waited} ticks")]
    EngineTimeout { counter: u64, waited: u64 },

    #[error("Cipher engine received an init pulse while busy")]
    EngineBusy,

    #[error("Invalid round count: {rounds} (must be a non-zero even number)")]
    InvalidRounds { rounds: u8 },

    #[error("Reference cipher has no variant with {rounds} rounds")]
    UnsupportedReferenceRounds { rounds: u8 },

    #[error("Engine timeout must be at least one tick")]
    InvalidTimeout,

    #[error("Exchange incomplete: {received} of 64 bytes after {ticks} ticks")]
    IncompleteExchange { received: usize, ticks: u64 },
}

/// Result alias used throughout the crate
pub type Result<T> = core::result::Result<T, ChannelError>;
