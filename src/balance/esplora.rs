use async_trait::async_trait;
use serde_json::Value;

use super::rpc::ChainRpc;
use crate::error::RpcError;

/// Bitcoin balances from an Esplora REST API
pub struct EsploraRpc {
    client: reqwest::Client,
    base_url: String,
}

impl EsploraRpc {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Confirmed plus mempool balance in satoshis
///
/// Funded and spent sums are totalled across both buckets before
/// subtracting, so an unconfirmed spend of a confirmed coin counts.
fn address_balance(addr_info: &Value) -> u128 {
    let sum = |field: &str| {
        ["chain_stats", "mempool_stats"]
            .iter()
            .map(|bucket| u128::from(addr_info[*bucket][field].as_u64().unwrap_or(0)))
            .sum::<u128>()
    };

    sum("funded_txo_sum").saturating_sub(sum("spent_txo_sum"))
}

#[async_trait]
impl ChainRpc for EsploraRpc {
    async fn get_native_balance(&self, address: &str) -> Result<u128, RpcError> {
        let url = format!("{}/address/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(format!("Esplora returned HTTP {} for {}", status, url)));
        }

        let addr_info: Value = response.json().await?;
        if addr_info.get("chain_stats").is_none() {
            return Err(RpcError::InvalidResponse(format!(
                "Esplora response for {} has no chain_stats",
                address
            )));
        }
        Ok(address_balance(&addr_info))
    }
}
