//! Error types for wallet provisioning and portfolio refresh
//!
//! Chain-level and per-address failures (`DerivationError`, `RpcError`) are
//! isolated by their callers. Only `PortfolioError` reaches the outer surface.

use std::time::Duration;
use thiserror::Error;

use crate::chains::Blockchain;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid refresh transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Wallet provisioning failed for every chain: {0}")]
    Provisioning(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortfolioError {
    /// Whether a retry of the same refresh could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortfolioError::Storage(StorageError::Unavailable(_)) => true,
            PortfolioError::Storage(StorageError::Io(_)) => true,
            PortfolioError::Provisioning(_) => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Invalid mnemonic phrase: {0}")]
    InvalidPhrase(String),

    #[error("A different mnemonic is already stored for user {0}")]
    AlreadyExists(String),

    #[error("Entropy source failed: {0}")]
    Entropy(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid derivation path: {0}")]
    PathParse(String),

    #[error("Key derivation library failure: {0}")]
    LibraryFailure(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unique constraint violation. Callers treat it as "already exists".
    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug, Clone)]
pub enum RpcError {
    #[error("RPC call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported RPC operation: {0}")]
    Unsupported(String),

    #[error("No RPC client configured for {0}")]
    NotConfigured(Blockchain),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Http(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,

    #[error("Malformed ciphertext: {0}")]
    Malformed(String),
}
