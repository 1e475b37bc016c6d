//! Error types for StarChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Challenge expired: issued at {issued_at}, now {now} (window {window_secs}s)")]
    ExpiredChallenge {
        issued_at: u64,
        now: u64,
        window_secs: u64,
    },
    #[error("Challenge issued in the future: issued at {issued_at}, now {now}")]
    ChallengeFromFuture { issued_at: u64, now: u64 },
    #[error("Invalid challenge: {0}")]
    InvalidChallenge(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
