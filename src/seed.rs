//! Per-user BIP-39 mnemonic lifecycle
//!
//! A user's mnemonic is created at most once and never regenerated while a
//! valid one exists. Concurrent creators race on the store's create-if-absent
//! operation; the loser discards its phrase and adopts the winner's.

use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::SeedError;
use crate::storage::Persistence;

/// Word counts accepted by BIP-39
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// 256 bits of entropy, 24 words
const ENTROPY_BYTES: usize = 32;

pub struct SeedManager {
    store: Arc<dyn Persistence>,
}

impl SeedManager {
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }

    /// Return the user's mnemonic, creating and persisting one if absent
    pub async fn get_or_create(&self, user_id: &str) -> Result<Mnemonic, SeedError> {
        if let Some(stored) = self.store.get_mnemonic(user_id).await? {
            return Self::parse(&stored);
        }

        let mnemonic = Self::generate()?;
        let phrase = Zeroizing::new(mnemonic.to_string());

        if self.store.put_mnemonic_if_absent(user_id, &phrase).await? {
            log::info!("🔑 Created mnemonic for user {}", user_id);
            return Ok(mnemonic);
        }

        log::debug!("Lost mnemonic creation race for user {}, adopting stored phrase", user_id);
        match self.store.get_mnemonic(user_id).await? {
            Some(stored) => Self::parse(&stored),
            None => Err(SeedError::Storage(crate::error::StorageError::Corrupt(format!(
                "mnemonic for user {} vanished after a conflicting write",
                user_id
            )))),
        }
    }

    /// Persist an externally supplied phrase for a user without one
    ///
    /// Re-importing the stored phrase is a no-op. A different stored phrase is
    /// never replaced.
    pub async fn import(&self, user_id: &str, phrase: &str) -> Result<Mnemonic, SeedError> {
        let mnemonic = Self::parse(phrase)?;
        let normalized = Zeroizing::new(mnemonic.to_string());

        if !self.store.put_mnemonic_if_absent(user_id, &normalized).await? {
            let stored = self.store.get_mnemonic(user_id).await?;
            let same = stored
                .as_deref()
                .map(|s| Self::normalize(s) == *normalized)
                .unwrap_or(false);
            if !same {
                return Err(SeedError::AlreadyExists(user_id.to_string()));
            }
        }

        log::info!("🔑 Imported mnemonic for user {}", user_id);
        Ok(mnemonic)
    }

    /// Fresh 24-word mnemonic from the OS entropy source
    pub fn generate() -> Result<Mnemonic, SeedError> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
        OsRng
            .try_fill_bytes(entropy.as_mut_slice())
            .map_err(|e| SeedError::Entropy(e.to_string()))?;

        Mnemonic::from_entropy(entropy.as_slice())
            .map_err(|e| SeedError::InvalidPhrase(e.to_string()))
    }

    pub fn validate(phrase: &str) -> bool {
        Self::parse(phrase).is_ok()
    }

    /// Parse after collapsing whitespace and lowercasing
    pub fn parse(phrase: &str) -> Result<Mnemonic, SeedError> {
        let normalized = Zeroizing::new(Self::normalize(phrase));
        let word_count = normalized.split(' ').filter(|w| !w.is_empty()).count();
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(SeedError::InvalidPhrase(format!(
                "expected 12, 15, 18, 21 or 24 words, got {}",
                word_count
            )));
        }

        Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|e| SeedError::InvalidPhrase(e.to_string()))
    }

    fn normalize(phrase: &str) -> String {
        phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
