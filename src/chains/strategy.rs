//! Ordered derivation strategies
//!
//! A [`DerivationPlan`] tries its strategies in order. The first strategy that
//! derives at least one chain wins; every earlier failure is kept in the
//! report instead of being discarded.

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::{derive_all, Blockchain, ChainDeriver, ChainOutcome, MasterSeed};
use crate::error::DerivationError;

#[async_trait]
pub trait DerivationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn derive(
        &self,
        seed: Arc<MasterSeed>,
        derivers: &[Arc<dyn ChainDeriver>],
    ) -> Vec<ChainOutcome>;
}

/// All chains at once on the blocking thread pool
pub struct ParallelDerivation;

#[async_trait]
impl DerivationStrategy for ParallelDerivation {
    fn name(&self) -> &'static str {
        "parallel"
    }

    async fn derive(
        &self,
        seed: Arc<MasterSeed>,
        derivers: &[Arc<dyn ChainDeriver>],
    ) -> Vec<ChainOutcome> {
        derive_all(seed, derivers).await
    }
}

/// One chain after another on the calling task. Panics are contained per chain.
pub struct SequentialDerivation;

#[async_trait]
impl DerivationStrategy for SequentialDerivation {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn derive(
        &self,
        seed: Arc<MasterSeed>,
        derivers: &[Arc<dyn ChainDeriver>],
    ) -> Vec<ChainOutcome> {
        derivers
            .iter()
            .map(|deriver| {
                let blockchain = deriver.blockchain();
                let result = catch_unwind(AssertUnwindSafe(|| deriver.derive(&seed)))
                    .unwrap_or_else(|_| {
                        Err(DerivationError::LibraryFailure(format!(
                            "{} deriver panicked",
                            blockchain
                        )))
                    });
                ChainOutcome { blockchain, result }
            })
            .collect()
    }
}

/// A strategy attempt that produced no usable chain
#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub strategy: &'static str,
    pub failures: Vec<(Blockchain, DerivationError)>,
}

#[derive(Debug)]
pub struct DerivationReport {
    /// Per-chain results of the winning strategy, or of the last one tried
    pub outcomes: Vec<ChainOutcome>,
    pub strategy: Option<&'static str>,
    pub attempts: Vec<StrategyAttempt>,
}

impl DerivationReport {
    pub fn succeeded(&self) -> bool {
        self.strategy.is_some()
    }
}

pub struct DerivationPlan {
    strategies: Vec<Box<dyn DerivationStrategy>>,
}

impl DerivationPlan {
    pub fn new(strategies: Vec<Box<dyn DerivationStrategy>>) -> Self {
        Self { strategies }
    }

    /// Parallel first, sequential as fallback
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ParallelDerivation),
            Box::new(SequentialDerivation),
        ])
    }

    pub async fn run(
        &self,
        seed: Arc<MasterSeed>,
        derivers: &[Arc<dyn ChainDeriver>],
    ) -> DerivationReport {
        let mut attempts = Vec::new();
        let mut last_outcomes = Vec::new();

        if derivers.is_empty() {
            return DerivationReport {
                outcomes: Vec::new(),
                strategy: None,
                attempts,
            };
        }

        for strategy in &self.strategies {
            let outcomes = strategy.derive(seed.clone(), derivers).await;

            if outcomes.iter().any(|o| o.result.is_ok()) {
                log::debug!(
                    "Derivation strategy '{}' succeeded for {} chain(s)",
                    strategy.name(),
                    outcomes.iter().filter(|o| o.result.is_ok()).count()
                );
                return DerivationReport {
                    outcomes,
                    strategy: Some(strategy.name()),
                    attempts,
                };
            }

            let failures: Vec<_> = outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().err().map(|e| (o.blockchain, e.clone())))
                .collect();
            log::warn!(
                "Derivation strategy '{}' produced no wallets ({} failure(s)), trying next",
                strategy.name(),
                failures.len()
            );
            attempts.push(StrategyAttempt {
                strategy: strategy.name(),
                failures,
            });
            last_outcomes = outcomes;
        }

        DerivationReport {
            outcomes: last_outcomes,
            strategy: None,
            attempts,
        }
    }
}

impl Default for DerivationPlan {
    fn default() -> Self {
        Self::standard()
    }
}
