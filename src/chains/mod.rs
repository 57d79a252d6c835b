//! Per-chain key derivation
//!
//! - `path.rs` - Derivation path parsing
//! - `secp256k1.rs` - BIP-32 derivers (Ethereum, Polygon, Tron, Bitcoin)
//! - `ed25519.rs` - SLIP-0010 derivers (Solana, Sui)
//! - `strategy.rs` - Ordered derivation strategies with collected diagnostics
//!
//! Every deriver implements [`ChainDeriver`]. Derivation is deterministic:
//! the same seed and path always produce the same address and key.

pub mod ed25519;
pub mod path;
pub mod secp256k1;
pub mod strategy;

pub use ed25519::{Ed25519Deriver, Ed25519Encoder, SolanaEncoder, SuiEncoder};
pub use path::{ChildIndex, DerivationPath};
pub use secp256k1::{EvmEncoder, P2wpkhEncoder, Secp256k1Deriver, Secp256k1Encoder, TronEncoder};
pub use strategy::{
    DerivationPlan, DerivationReport, DerivationStrategy, ParallelDerivation,
    SequentialDerivation, StrategyAttempt,
};

use bip39::Mnemonic;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::DerivationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Blockchain {
    Ethereum,
    Polygon,
    Tron,
    Bitcoin,
    Solana,
    Sui,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Secp256k1,
    Ed25519,
}

impl Blockchain {
    pub const ALL: [Blockchain; 6] = [
        Blockchain::Ethereum,
        Blockchain::Polygon,
        Blockchain::Tron,
        Blockchain::Bitcoin,
        Blockchain::Solana,
        Blockchain::Sui,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Blockchain::Ethereum => "Ethereum",
            Blockchain::Polygon => "Polygon",
            Blockchain::Tron => "Tron",
            Blockchain::Bitcoin => "Bitcoin",
            Blockchain::Solana => "Solana",
            Blockchain::Sui => "Sui",
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            Blockchain::Ethereum => "ETH",
            Blockchain::Polygon => "MATIC",
            Blockchain::Tron => "TRX",
            Blockchain::Bitcoin => "BTC",
            Blockchain::Solana => "SOL",
            Blockchain::Sui => "SUI",
        }
    }

    /// Decimal places between the base unit (wei, sun, sat, lamport, mist)
    /// and the display unit
    pub fn native_decimals(&self) -> u32 {
        match self {
            Blockchain::Ethereum | Blockchain::Polygon => 18,
            Blockchain::Tron => 6,
            Blockchain::Bitcoin => 8,
            Blockchain::Solana | Blockchain::Sui => 9,
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            Blockchain::Solana | Blockchain::Sui => Curve::Ed25519,
            _ => Curve::Secp256k1,
        }
    }

    /// Standard derivation path used by third-party wallets for this chain
    pub fn default_path(&self) -> &'static str {
        match self {
            Blockchain::Ethereum | Blockchain::Polygon => "m/44'/60'/0'/0/0",
            Blockchain::Tron => "m/44'/195'/0'/0/0",
            Blockchain::Bitcoin => "m/84'/0'/0'/0/0",
            Blockchain::Solana => "m/44'/501'/0'/0'",
            Blockchain::Sui => "m/44'/784'/0'/0'/0'",
        }
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Blockchain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Blockchain::ALL
            .iter()
            .copied()
            .find(|chain| chain.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown blockchain: {}", s))
    }
}

/// 64-byte BIP-39 seed shared read-only by all derivers of one run
pub struct MasterSeed(Zeroizing<[u8; 64]>);

impl MasterSeed {
    /// Runs the BIP-39 PBKDF2 stretch with an empty passphrase
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        Self(Zeroizing::new(mnemonic.to_seed("")))
    }

    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for MasterSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSeed(<redacted>)")
    }
}

/// Address and key material produced by one deriver
#[derive(Clone)]
pub struct WalletData {
    pub blockchain: Blockchain,
    pub address: String,
    pub public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
    exported_key: Zeroizing<String>,
}

impl WalletData {
    pub fn new(
        blockchain: Blockchain,
        address: String,
        public_key: Vec<u8>,
        private_key: Vec<u8>,
        exported_key: String,
    ) -> Self {
        Self {
            blockchain,
            address,
            public_key,
            private_key: Zeroizing::new(private_key),
            exported_key: Zeroizing::new(exported_key),
        }
    }

    /// Raw 32-byte secret key
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Private key in the chain's customary import format
    pub fn export_private_key(&self) -> &str {
        &self.exported_key
    }
}

impl fmt::Debug for WalletData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletData")
            .field("blockchain", &self.blockchain)
            .field("address", &self.address)
            .field("public_key", &hex::encode(&self.public_key))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Capability shared by every chain deriver
///
/// Implementations are synchronous and CPU-bound; [`derive_all`] moves them
/// onto the blocking pool so callers never care which chain is expensive.
pub trait ChainDeriver: Send + Sync {
    fn blockchain(&self) -> Blockchain;

    fn path(&self) -> &DerivationPath;

    fn derive_from(
        &self,
        seed: &MasterSeed,
        path: &DerivationPath,
    ) -> Result<WalletData, DerivationError>;

    /// Derive at the deriver's configured path
    fn derive(&self, seed: &MasterSeed) -> Result<WalletData, DerivationError> {
        self.derive_from(seed, self.path())
    }
}

/// One chain's result within a partial-success batch
#[derive(Debug)]
pub struct ChainOutcome {
    pub blockchain: Blockchain,
    pub result: Result<WalletData, DerivationError>,
}

/// Standard deriver set for all supported chains
pub fn default_derivers(
    bitcoin_network: bitcoin::Network,
) -> Result<Vec<Arc<dyn ChainDeriver>>, DerivationError> {
    let bitcoin_path = match bitcoin_network {
        bitcoin::Network::Bitcoin => Blockchain::Bitcoin.default_path().to_string(),
        _ => "m/84'/1'/0'/0/0".to_string(),
    };

    Ok(vec![
        Arc::new(Secp256k1Deriver::new(
            Blockchain::Ethereum,
            Blockchain::Ethereum.default_path().parse()?,
            Box::new(EvmEncoder),
        )),
        Arc::new(Secp256k1Deriver::new(
            Blockchain::Polygon,
            Blockchain::Polygon.default_path().parse()?,
            Box::new(EvmEncoder),
        )),
        Arc::new(Secp256k1Deriver::new(
            Blockchain::Tron,
            Blockchain::Tron.default_path().parse()?,
            Box::new(TronEncoder),
        )),
        Arc::new(
            Secp256k1Deriver::new(
                Blockchain::Bitcoin,
                bitcoin_path.parse()?,
                Box::new(P2wpkhEncoder::new(bitcoin_network)),
            )
            .with_network(bitcoin_network),
        ),
        Arc::new(Ed25519Deriver::new(
            Blockchain::Solana,
            Blockchain::Solana.default_path().parse()?,
            Box::new(SolanaEncoder),
        )?),
        Arc::new(Ed25519Deriver::new(
            Blockchain::Sui,
            Blockchain::Sui.default_path().parse()?,
            Box::new(SuiEncoder),
        )?),
    ])
}

/// Run every deriver concurrently and collect one result per chain
///
/// A failing or panicking deriver only affects its own entry.
pub async fn derive_all(
    seed: Arc<MasterSeed>,
    derivers: &[Arc<dyn ChainDeriver>],
) -> Vec<ChainOutcome> {
    let tasks = derivers.iter().map(|deriver| {
        let deriver = deriver.clone();
        let seed = seed.clone();
        let blockchain = deriver.blockchain();
        async move {
            let result = match tokio::task::spawn_blocking(move || deriver.derive(&seed)).await {
                Ok(result) => result,
                Err(e) => Err(DerivationError::LibraryFailure(format!(
                    "{} derivation task failed: {}",
                    blockchain, e
                ))),
            };
            ChainOutcome { blockchain, result }
        }
    });

    join_all(tasks).await
}
