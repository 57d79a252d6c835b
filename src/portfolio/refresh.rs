//! Portfolio refresh cycle
//!
//! ```text
//! Idle -> FetchingWallets -> [CreatingWallets -> FetchingWallets]
//!      -> FetchingBalances -> Aggregating -> Ready
//! any state -> Error,  Error -> FetchingWallets (retry)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::aggregator::{AggregationWarning, Asset, WalletAggregator};
use super::price::PriceFeed;
use crate::balance::{BalanceFetcher, BalanceKey, BalanceReading};
use crate::chains::Blockchain;
use crate::error::PortfolioError;
use crate::registry::WalletRegistry;
use crate::storage::{Persistence, WalletKey, WalletRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    FetchingWallets,
    CreatingWallets,
    FetchingBalances,
    Aggregating,
    Ready,
    Error,
}

impl RefreshState {
    pub fn can_transition_to(self, next: RefreshState) -> bool {
        use RefreshState::*;
        match (self, next) {
            (Error, Error) => false,
            (_, Error) => true,
            (Idle, FetchingWallets)
            | (FetchingWallets, CreatingWallets)
            | (FetchingWallets, FetchingBalances)
            | (CreatingWallets, FetchingWallets)
            | (FetchingBalances, Aggregating)
            | (Aggregating, Ready)
            | (Error, FetchingWallets) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshState::Idle => "Idle",
            RefreshState::FetchingWallets => "FetchingWallets",
            RefreshState::CreatingWallets => "CreatingWallets",
            RefreshState::FetchingBalances => "FetchingBalances",
            RefreshState::Aggregating => "Aggregating",
            RefreshState::Ready => "Ready",
            RefreshState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Tracks one refresh through its states, rejecting invalid transitions
#[derive(Debug, Clone)]
pub struct RefreshMachine {
    state: RefreshState,
    history: Vec<RefreshState>,
}

impl RefreshMachine {
    pub fn new() -> Self {
        Self {
            state: RefreshState::Idle,
            history: vec![RefreshState::Idle],
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[RefreshState] {
        &self.history
    }

    pub fn transition(&mut self, next: RefreshState) -> Result<(), PortfolioError> {
        if !self.state.can_transition_to(next) {
            return Err(PortfolioError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        log::debug!("Refresh state {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub fn fail(&mut self) {
        if self.state != RefreshState::Error {
            self.state = RefreshState::Error;
            self.history.push(RefreshState::Error);
        }
    }

    pub fn retry(&mut self) -> Result<(), PortfolioError> {
        self.transition(RefreshState::FetchingWallets)
    }
}

impl Default for RefreshMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// A wallet whose balance could not be read this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnrefreshedBalance {
    pub blockchain: Blockchain,
    pub currency_symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub user_id: String,
    pub assets: Vec<Asset>,
    /// Shown as zero in `assets`; the stored balance was left untouched
    pub unrefreshed: Vec<UnrefreshedBalance>,
    pub warnings: Vec<AggregationWarning>,
    pub state: RefreshState,
    pub total_value: f64,
    pub refreshed_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn is_partial(&self) -> bool {
        !self.unrefreshed.is_empty()
    }
}

pub struct PortfolioRefresh {
    store: Arc<dyn Persistence>,
    registry: Arc<WalletRegistry>,
    fetcher: Arc<BalanceFetcher>,
    prices: Arc<dyn PriceFeed>,
    max_retries: u32,
}

impl PortfolioRefresh {
    pub fn new(
        store: Arc<dyn Persistence>,
        registry: Arc<WalletRegistry>,
        fetcher: Arc<BalanceFetcher>,
        prices: Arc<dyn PriceFeed>,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
            prices,
            max_retries: 1,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub async fn run(&self, user_id: &str, force: bool) -> Result<PortfolioSnapshot, PortfolioError> {
        let mut machine = RefreshMachine::new();
        self.run_with(user_id, force, &mut machine).await
    }

    /// Drive a refresh through `machine`, retrying retryable failures
    pub async fn run_with(
        &self,
        user_id: &str,
        force: bool,
        machine: &mut RefreshMachine,
    ) -> Result<PortfolioSnapshot, PortfolioError> {
        machine.transition(RefreshState::FetchingWallets)?;

        let mut attempt = 0;
        loop {
            match self.cycle(user_id, force, machine).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    machine.fail();
                    if e.is_retryable() && attempt < self.max_retries {
                        attempt += 1;
                        log::warn!(
                            "Portfolio refresh for user {} failed ({}), retry {}/{}",
                            user_id,
                            e,
                            attempt,
                            self.max_retries
                        );
                        machine.retry()?;
                        continue;
                    }
                    log::error!("❌ Portfolio refresh for user {} failed: {}", user_id, e);
                    return Err(e);
                }
            }
        }
    }

    async fn cycle(
        &self,
        user_id: &str,
        force: bool,
        machine: &mut RefreshMachine,
    ) -> Result<PortfolioSnapshot, PortfolioError> {
        let mut wallets = self.store.list_wallets(user_id).await?;

        if self.has_missing_targets(&wallets) {
            machine.transition(RefreshState::CreatingWallets)?;
            self.registry.ensure_wallets(user_id).await?;
            machine.transition(RefreshState::FetchingWallets)?;
            wallets = self.store.list_wallets(user_id).await?;
        }

        machine.transition(RefreshState::FetchingBalances)?;
        let unrefreshed = self.refresh_balances(user_id, &mut wallets, force).await?;

        machine.transition(RefreshState::Aggregating)?;
        let mut symbols: Vec<String> = wallets.iter().map(|w| w.currency_symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        let prices = self.prices.get_prices(&symbols).await;
        let aggregation = WalletAggregator::aggregate(&wallets, &prices);

        machine.transition(RefreshState::Ready)?;

        let total_value = aggregation.assets.iter().map(|a| a.value).sum();
        if !unrefreshed.is_empty() {
            log::warn!(
                "Some balances could not be refreshed for user {} ({} of {})",
                user_id,
                unrefreshed.len(),
                wallets.len()
            );
        }
        log::info!(
            "📊 Portfolio for user {}: {} asset(s), total value {:.2}",
            user_id,
            aggregation.assets.len(),
            total_value
        );

        Ok(PortfolioSnapshot {
            user_id: user_id.to_string(),
            assets: aggregation.assets,
            unrefreshed,
            warnings: aggregation.warnings,
            state: machine.state(),
            total_value,
            refreshed_at: Utc::now(),
        })
    }

    fn has_missing_targets(&self, wallets: &[WalletRecord]) -> bool {
        let present: HashSet<WalletKey> = wallets.iter().map(|w| w.key()).collect();
        self.registry
            .targets()
            .iter()
            .any(|t| !present.contains(&t.key()))
    }

    /// Fetch each distinct balance once and fold the readings into `wallets`
    ///
    /// Known readings are persisted when forced or changed. Unknown readings
    /// show as zero but keep the stored balance.
    async fn refresh_balances(
        &self,
        user_id: &str,
        wallets: &mut [WalletRecord],
        force: bool,
    ) -> Result<Vec<UnrefreshedBalance>, PortfolioError> {
        let mut keys: Vec<BalanceKey> = wallets.iter().map(BalanceKey::for_record).collect();
        keys.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        keys.dedup();

        let readings: HashMap<BalanceKey, BalanceReading> = keys
            .iter()
            .cloned()
            .zip(self.fetcher.fetch_many(&keys, force).await)
            .collect();

        let mut unrefreshed = Vec::new();
        for wallet in wallets.iter_mut() {
            let reading = readings
                .get(&BalanceKey::for_record(wallet))
                .copied()
                .unwrap_or(BalanceReading::Unknown);

            match reading {
                BalanceReading::Known(balance) => {
                    if force || balance != wallet.balance {
                        self.store
                            .update_balance(user_id, &wallet.address, &wallet.currency_symbol, balance)
                            .await?;
                    }
                    wallet.balance = balance;
                }
                BalanceReading::Unknown => {
                    unrefreshed.push(UnrefreshedBalance {
                        blockchain: wallet.blockchain,
                        currency_symbol: wallet.currency_symbol.clone(),
                        address: wallet.address.clone(),
                    });
                    wallet.balance = 0.0;
                }
            }
        }

        Ok(unrefreshed)
    }
}
