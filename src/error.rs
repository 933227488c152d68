//! Error types for the zombie mod core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZmError {
    #[error("Registration rejected: {0}")]
    Registration(String),

    #[error("Registration closed: {0} cannot be registered after the first round started")]
    RegistrationClosed(String),

    #[error("Unknown mode id: {0}")]
    UnknownMode(u32),

    #[error("Unknown class id: {0}")]
    UnknownClass(u32),

    #[error("Invalid player slot: {0}")]
    InvalidSlot(u32),

    #[error("No players slots left (capacity {0})")]
    ServerFull(usize),

    #[error("Illegal round transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: crate::game::RoundState,
        to: crate::game::RoundState,
    },

    #[error("No game modes registered (or no fallback mode with chance 0)")]
    NoModes,

    #[error("Invalid game action: {0}")]
    InvalidAction(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ZmError>;
