/// Portfolio configuration from environment variables
///
/// Controls storage location, the Bitcoin network, chain RPC endpoints and
/// balance refresh timing. Defaults target public mainnet endpoints.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::PortfolioError;
use crate::storage::KeyCipher;

#[derive(Clone, Debug)]
pub struct PortfolioConfig {
    /// Root directory of the file store
    pub data_dir: PathBuf,
    pub bitcoin_network: bitcoin::Network,
    pub ethereum_rpc_url: String,
    pub polygon_rpc_url: String,
    /// TronGrid-compatible HTTP API
    pub tron_api_url: String,
    pub tron_api_key: Option<String>,
    pub esplora_url: String,
    pub solana_rpc_url: String,
    pub sui_rpc_url: String,
    /// CoinGecko-compatible price API
    pub price_api_url: String,
    pub balance_timeout: Duration,
    pub balance_cache_ttl: Duration,
    pub max_refresh_retries: u32,
    /// Hex-encoded 32-byte key for private keys at rest
    pub encryption_key: Option<String>,
}

impl PortfolioConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WALLET_DATA_DIR`: file store root (default `./wallets`)
    /// - `BITCOIN_NETWORK`: "bitcoin" (default), "testnet", "signet" or "regtest"
    /// - `ETHEREUM_RPC_URL`, `POLYGON_RPC_URL`, `SOLANA_RPC_URL`, `SUI_RPC_URL`: JSON-RPC endpoints
    /// - `TRON_API_URL`, `TRON_API_KEY`: TronGrid endpoint and optional key
    /// - `ESPLORA_URL`: Esplora API (default depends on the network)
    /// - `PRICE_API_URL`: price API base URL
    /// - `BALANCE_TIMEOUT_SECS` (15), `BALANCE_CACHE_TTL_SECS` (300), `REFRESH_MAX_RETRIES` (1)
    /// - `WALLET_ENCRYPTION_KEY`: 64 hex characters, required by [`WalletManager::new`](crate::WalletManager::new)
    ///
    /// # Examples
    ///
    /// ```bash
    /// BITCOIN_NETWORK=regtest ESPLORA_URL=http://localhost:3000 portfolio-sync alice
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let network_str = env::var("BITCOIN_NETWORK")
            .unwrap_or_else(|_| "bitcoin".to_string())
            .to_lowercase();
        let bitcoin_network = parse_network(&network_str).unwrap_or_else(|| {
            log::warn!("⚠️  Unknown network '{}', defaulting to mainnet", network_str);
            bitcoin::Network::Bitcoin
        });
        log::info!("🌐 Using Bitcoin network: {}", bitcoin_network);

        let esplora_url = env::var("ESPLORA_URL").unwrap_or_else(|_| {
            default_esplora_url(bitcoin_network).to_string()
        });
        log::info!("📡 Esplora URL: {}", esplora_url);

        let config = Self {
            data_dir: env::var("WALLET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            bitcoin_network,
            ethereum_rpc_url: env::var("ETHEREUM_RPC_URL").unwrap_or(defaults.ethereum_rpc_url),
            polygon_rpc_url: env::var("POLYGON_RPC_URL").unwrap_or(defaults.polygon_rpc_url),
            tron_api_url: env::var("TRON_API_URL").unwrap_or(defaults.tron_api_url),
            tron_api_key: env::var("TRON_API_KEY").ok(),
            esplora_url,
            solana_rpc_url: env::var("SOLANA_RPC_URL").unwrap_or(defaults.solana_rpc_url),
            sui_rpc_url: env::var("SUI_RPC_URL").unwrap_or(defaults.sui_rpc_url),
            price_api_url: env::var("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            balance_timeout: Duration::from_secs(env_or("BALANCE_TIMEOUT_SECS", 15)),
            balance_cache_ttl: Duration::from_secs(env_or("BALANCE_CACHE_TTL_SECS", 300)),
            max_refresh_retries: env_or("REFRESH_MAX_RETRIES", 1),
            encryption_key: env::var("WALLET_ENCRYPTION_KEY").ok(),
        };

        log::info!("💾 Wallet data directory: {}", config.data_dir.display());
        config
    }

    /// Cipher for private keys at rest
    ///
    /// Without `WALLET_ENCRYPTION_KEY` a random key is used, and keys written
    /// by this process cannot be decrypted by any other. Stores that outlive
    /// the process must use [`Self::persistent_cipher`].
    pub fn cipher(&self) -> Result<KeyCipher, PortfolioError> {
        match &self.encryption_key {
            Some(key) => Ok(KeyCipher::from_hex(key)?),
            None => {
                log::warn!("⚠️  WALLET_ENCRYPTION_KEY not set - using an ephemeral key (DEVELOPMENT ONLY)");
                Ok(KeyCipher::generate())
            }
        }
    }

    /// Cipher for a store that outlives this process. Requires `WALLET_ENCRYPTION_KEY`.
    pub fn persistent_cipher(&self) -> Result<KeyCipher, PortfolioError> {
        match &self.encryption_key {
            Some(key) => Ok(KeyCipher::from_hex(key)?),
            None => Err(PortfolioError::Config(
                "WALLET_ENCRYPTION_KEY must be set to 64 hex chars before wallets are persisted"
                    .to_string(),
            )),
        }
    }
}

impl Default for PortfolioConfig {
    /// Mainnet public endpoints
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./wallets"),
            bitcoin_network: bitcoin::Network::Bitcoin,
            ethereum_rpc_url: "https://ethereum-rpc.publicnode.com".to_string(),
            polygon_rpc_url: "https://polygon-rpc.com".to_string(),
            tron_api_url: "https://api.trongrid.io".to_string(),
            tron_api_key: None,
            esplora_url: default_esplora_url(bitcoin::Network::Bitcoin).to_string(),
            solana_rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            sui_rpc_url: "https://fullnode.mainnet.sui.io:443".to_string(),
            price_api_url: "https://api.coingecko.com/api/v3".to_string(),
            balance_timeout: Duration::from_secs(15),
            balance_cache_ttl: Duration::from_secs(300),
            max_refresh_retries: 1,
            encryption_key: None,
        }
    }
}

fn parse_network(name: &str) -> Option<bitcoin::Network> {
    match name {
        "bitcoin" | "mainnet" | "" => Some(bitcoin::Network::Bitcoin),
        "testnet" => Some(bitcoin::Network::Testnet),
        "signet" => Some(bitcoin::Network::Signet),
        "regtest" => Some(bitcoin::Network::Regtest),
        _ => None,
    }
}

fn default_esplora_url(network: bitcoin::Network) -> &'static str {
    match network {
        bitcoin::Network::Bitcoin => "https://blockstream.info/api",
        bitcoin::Network::Testnet => "https://blockstream.info/testnet/api",
        bitcoin::Network::Regtest => "http://localhost:3000",
        _ => "https://mempool.space/signet/api",
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("⚠️  Invalid {}='{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
