use async_trait::async_trait;
use serde_json::{json, Value};

use super::rpc::ChainRpc;
use crate::error::RpcError;

const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// TronGrid HTTP API client
///
/// Native TRX comes from `/wallet/getaccount`. TRC-20 balances come from the
/// indexed `/v1/accounts/{address}` view.
pub struct TronRpc {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TronRpc {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, RpcError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(format!("Tron API returned HTTP {}", status)));
        }
        Ok(response.json().await?)
    }
}

/// Balance of an account from `/wallet/getaccount`
///
/// Accounts that were never activated come back as `{}`.
fn parse_account_balance(account: &Value) -> Result<u128, RpcError> {
    if let Some(error) = account.get("Error") {
        return Err(RpcError::InvalidResponse(format!("getaccount: {}", error)));
    }
    match account.get("balance") {
        None => Ok(0),
        Some(balance) => balance
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| RpcError::InvalidResponse(format!("getaccount: bad balance {}", balance))),
    }
}

/// Look up one contract in the `trc20` list of `/v1/accounts/{address}`
fn parse_trc20_balance(payload: &Value, contract: &str) -> Result<u128, RpcError> {
    let Some(account) = payload["data"].as_array().and_then(|data| data.first()) else {
        return Ok(0);
    };

    let holdings = account["trc20"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    for holding in holdings {
        if let Some(amount) = holding.get(contract) {
            return amount
                .as_str()
                .and_then(|s| s.parse::<u128>().ok())
                .ok_or_else(|| {
                    RpcError::InvalidResponse(format!("trc20 amount for {}: {}", contract, amount))
                });
        }
    }
    Ok(0)
}

#[async_trait]
impl ChainRpc for TronRpc {
    async fn get_native_balance(&self, address: &str) -> Result<u128, RpcError> {
        let url = format!("{}/wallet/getaccount", self.base_url);
        let request = self
            .client
            .post(&url)
            .json(&json!({ "address": address, "visible": true }));
        let account = self.send(request).await?;
        parse_account_balance(&account)
    }

    async fn get_token_balance(&self, address: &str, contract: &str) -> Result<u128, RpcError> {
        let url = format!("{}/v1/accounts/{}", self.base_url, address);
        let payload = self.send(self.client.get(&url)).await?;
        parse_trc20_balance(&payload, contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn test_account_balance() {
        assert_eq!(parse_account_balance(&json!({})).unwrap(), 0);
        assert_eq!(
            parse_account_balance(&json!({ "address": "T...", "balance": 2_500_000 })).unwrap(),
            2_500_000
        );
        assert!(parse_account_balance(&json!({ "Error": "bad address" })).is_err());
    }

    #[test]
    fn test_trc20_balance() {
        let payload = json!({
            "data": [{
                "balance": 10,
                "trc20": [
                    { "TXLAQ63Xg1NAzckPwKHvzw7CSEmLMEqcdj": "5" },
                    { USDT: "12345678" }
                ]
            }],
            "success": true
        });
        assert_eq!(parse_trc20_balance(&payload, USDT).unwrap(), 12_345_678);
        assert_eq!(parse_trc20_balance(&payload, "Tother").unwrap(), 0);
        assert_eq!(parse_trc20_balance(&json!({ "data": [] }), USDT).unwrap(), 0);
    }
}
