use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::price::PriceQuote;
use crate::chains::Blockchain;
use crate::storage::WalletRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkHolding {
    pub address: String,
    pub balance: f64,
}

/// One symbol summed across every network holding it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub symbol: String,
    pub total_amount: f64,
    pub per_network: BTreeMap<Blockchain, NetworkHolding>,
    pub price: f64,
    pub change_24h: f64,
    pub value: f64,
}

/// Informational notes; never fail an aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// Records on several networks share a symbol and were merged
    SymbolCollision {
        symbol: String,
        networks: Vec<Blockchain>,
    },
    MissingPrice {
        symbol: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregation {
    pub assets: Vec<Asset>,
    pub warnings: Vec<AggregationWarning>,
}

pub struct WalletAggregator;

impl WalletAggregator {
    pub fn process_wallets(
        records: &[WalletRecord],
        prices: &HashMap<String, PriceQuote>,
    ) -> Vec<Asset> {
        Self::aggregate(records, prices).assets
    }

    /// Group by symbol, attach prices and sort by value, highest first
    ///
    /// Grouping is by symbol string alone, so unrelated tokens sharing a
    /// ticker are merged. Several records for the same network and symbol
    /// count once, using the most recently updated.
    pub fn aggregate(records: &[WalletRecord], prices: &HashMap<String, PriceQuote>) -> Aggregation {
        let mut latest: HashMap<(Blockchain, &str), &WalletRecord> = HashMap::new();
        for record in records {
            latest
                .entry((record.blockchain, record.currency_symbol.as_str()))
                .and_modify(|current| {
                    if (record.updated_at, record.id) > (current.updated_at, current.id) {
                        *current = record;
                    }
                })
                .or_insert(record);
        }

        let mut by_symbol: BTreeMap<&str, BTreeMap<Blockchain, NetworkHolding>> = BTreeMap::new();
        for ((blockchain, symbol), record) in latest {
            by_symbol.entry(symbol).or_default().insert(
                blockchain,
                NetworkHolding {
                    address: record.address.clone(),
                    balance: record.balance,
                },
            );
        }

        let mut warnings = Vec::new();
        let mut assets: Vec<Asset> = by_symbol
            .into_iter()
            .map(|(symbol, per_network)| {
                if per_network.len() > 1 {
                    warnings.push(AggregationWarning::SymbolCollision {
                        symbol: symbol.to_string(),
                        networks: per_network.keys().copied().collect(),
                    });
                }

                let quote = prices.get(symbol).copied().unwrap_or_else(|| {
                    warnings.push(AggregationWarning::MissingPrice {
                        symbol: symbol.to_string(),
                    });
                    PriceQuote::default()
                });

                let total_amount: f64 = per_network.values().map(|h| h.balance).sum();
                Asset {
                    symbol: symbol.to_string(),
                    total_amount,
                    per_network,
                    price: quote.price,
                    change_24h: quote.change_24h,
                    value: total_amount * quote.price,
                }
            })
            .collect();

        assets.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        Aggregation { assets, warnings }
    }
}
