//! Chain RPC clients
//!
//! Every client returns integer base units. Conversion to display units and
//! timeout handling live in the fetcher.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::RpcError;

/// ERC-20 `balanceOf(address)` selector
const BALANCE_OF_SELECTOR: &str = "70a08231";

#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_native_balance(&self, address: &str) -> Result<u128, RpcError>;

    async fn get_token_balance(&self, address: &str, contract: &str) -> Result<u128, RpcError> {
        let _ = address;
        Err(RpcError::Unsupported(format!("token balance for contract {}", contract)))
    }
}

/// Minimal JSON-RPC 2.0 transport shared by the EVM, Solana and Sui clients
#[derive(Clone)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(format!("{} returned HTTP {}", method, status)));
        }

        let mut payload: Value = response.json().await?;
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::InvalidResponse(format!("{}: {}", method, error)));
        }

        match payload.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(RpcError::InvalidResponse(format!("{}: missing result", method))),
        }
    }
}

/// Parse an Ethereum `QUANTITY` or 32-byte word (`0x`-prefixed hex)
pub fn parse_hex_quantity(value: &str) -> Result<u128, RpcError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| RpcError::InvalidResponse(format!("not a hex quantity: {}", value)))?;

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }
    if significant.len() > 32 {
        return Err(RpcError::InvalidResponse(format!(
            "quantity exceeds 128 bits: {}",
            value
        )));
    }
    u128::from_str_radix(significant, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", value, e)))
}

/// Calldata for `balanceOf(owner)`
pub fn balance_of_calldata(owner: &str) -> Result<String, RpcError> {
    let hex_owner = owner.strip_prefix("0x").unwrap_or(owner);
    if hex_owner.len() != 40 || !hex_owner.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RpcError::InvalidResponse(format!("not an EVM address: {}", owner)));
    }
    Ok(format!(
        "0x{}{:0>64}",
        BALANCE_OF_SELECTOR,
        hex_owner.to_lowercase()
    ))
}

/// Ethereum and Polygon
pub struct EvmRpc {
    rpc: JsonRpcClient,
}

impl EvmRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            rpc: JsonRpcClient::new(url),
        }
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            rpc: JsonRpcClient::with_client(client, url),
        }
    }
}

#[async_trait]
impl ChainRpc for EvmRpc {
    async fn get_native_balance(&self, address: &str) -> Result<u128, RpcError> {
        let result = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        let quantity = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse("eth_getBalance: result is not a string".into()))?;
        parse_hex_quantity(quantity)
    }

    async fn get_token_balance(&self, address: &str, contract: &str) -> Result<u128, RpcError> {
        let call = json!({
            "to": contract,
            "data": balance_of_calldata(address)?,
        });
        let result = self.rpc.call("eth_call", json!([call, "latest"])).await?;
        let word = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse("eth_call: result is not a string".into()))?;
        parse_hex_quantity(word)
    }
}

pub struct SolanaRpc {
    rpc: JsonRpcClient,
}

impl SolanaRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            rpc: JsonRpcClient::new(url),
        }
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            rpc: JsonRpcClient::with_client(client, url),
        }
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn get_native_balance(&self, address: &str) -> Result<u128, RpcError> {
        let result = self
            .rpc
            .call("getBalance", json!([address, { "commitment": "confirmed" }]))
            .await?;
        result["value"]
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| RpcError::InvalidResponse(format!("getBalance: unexpected result {}", result)))
    }
}

pub struct SuiRpc {
    rpc: JsonRpcClient,
}

impl SuiRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            rpc: JsonRpcClient::new(url),
        }
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            rpc: JsonRpcClient::with_client(client, url),
        }
    }
}

#[async_trait]
impl ChainRpc for SuiRpc {
    async fn get_native_balance(&self, address: &str) -> Result<u128, RpcError> {
        let result = self.rpc.call("suix_getBalance", json!([address])).await?;
        // totalBalance is a decimal string
        result["totalBalance"]
            .as_str()
            .and_then(|s| s.parse::<u128>().ok())
            .ok_or_else(|| {
                RpcError::InvalidResponse(format!("suix_getBalance: unexpected result {}", result))
            })
    }

    async fn get_token_balance(&self, address: &str, coin_type: &str) -> Result<u128, RpcError> {
        let result = self
            .rpc
            .call("suix_getBalance", json!([address, coin_type]))
            .await?;
        result["totalBalance"]
            .as_str()
            .and_then(|s| s.parse::<u128>().ok())
            .ok_or_else(|| {
                RpcError::InvalidResponse(format!("suix_getBalance: unexpected result {}", result))
            })
    }
}
