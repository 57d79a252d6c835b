use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::targets::{default_targets, WalletTarget};
use crate::chains::{
    Blockchain, ChainDeriver, DerivationPlan, MasterSeed, StrategyAttempt, WalletData,
};
use crate::error::{DerivationError, PortfolioError, StorageError};
use crate::seed::SeedManager;
use crate::storage::{KeyCipher, NewWallet, Persistence, WalletKey, WalletRecord};

/// Per-user provisioning lock
///
/// Serializes provisioning for one user inside this process. Users never
/// wait on each other, and an entry disappears once no call holds it.
#[derive(Default)]
pub struct ProvisioningGuard {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl ProvisioningGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(user_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(user_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Users with a provisioning call in flight
    pub fn active_users(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

/// Outcome of one provisioning call
#[derive(Debug)]
pub struct ProvisionReport {
    /// Every live record of the user after provisioning
    pub wallets: Vec<WalletRecord>,
    pub created: usize,
    pub failures: Vec<(Blockchain, DerivationError)>,
    /// Derivation strategies that produced nothing before the winning one
    pub attempts: Vec<StrategyAttempt>,
}

pub struct WalletRegistry {
    store: Arc<dyn Persistence>,
    seeds: SeedManager,
    derivers: Vec<Arc<dyn ChainDeriver>>,
    plan: DerivationPlan,
    cipher: KeyCipher,
    targets: Vec<WalletTarget>,
    guard: ProvisioningGuard,
}

impl WalletRegistry {
    pub fn new(
        store: Arc<dyn Persistence>,
        derivers: Vec<Arc<dyn ChainDeriver>>,
        cipher: KeyCipher,
    ) -> Self {
        Self {
            seeds: SeedManager::new(store.clone()),
            store,
            derivers,
            plan: DerivationPlan::standard(),
            cipher,
            targets: default_targets(),
            guard: ProvisioningGuard::new(),
        }
    }

    pub fn with_targets(mut self, targets: Vec<WalletTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_plan(mut self, plan: DerivationPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn seeds(&self) -> &SeedManager {
        &self.seeds
    }

    pub fn targets(&self) -> &[WalletTarget] {
        &self.targets
    }

    pub fn guard(&self) -> &ProvisioningGuard {
        &self.guard
    }

    /// Make sure every target wallet exists and return all of the user's wallets
    pub async fn ensure_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>, PortfolioError> {
        Ok(self.ensure_wallets_report(user_id).await?.wallets)
    }

    pub async fn ensure_wallets_report(
        &self,
        user_id: &str,
    ) -> Result<ProvisionReport, PortfolioError> {
        let _permit = self.guard.acquire(user_id).await;

        let existing = self.store.list_wallets(user_id).await?;
        let present: HashSet<WalletKey> = existing.iter().map(|w| w.key()).collect();
        let missing: Vec<&WalletTarget> = self
            .targets
            .iter()
            .filter(|t| !present.contains(&t.key()))
            .collect();

        if missing.is_empty() {
            log::debug!("All {} wallets present for user {}", existing.len(), user_id);
            return Ok(ProvisionReport {
                wallets: existing,
                created: 0,
                failures: Vec::new(),
                attempts: Vec::new(),
            });
        }

        log::info!(
            "Provisioning {} missing wallet(s) for user {}",
            missing.len(),
            user_id
        );

        let mnemonic = self.seeds.get_or_create(user_id).await?;
        let seed = Arc::new(MasterSeed::from_mnemonic(&mnemonic));

        let needed: BTreeSet<Blockchain> = missing.iter().map(|t| t.blockchain).collect();
        let derivers: Vec<_> = self
            .derivers
            .iter()
            .filter(|d| needed.contains(&d.blockchain()))
            .cloned()
            .collect();

        let report = self.plan.run(seed, &derivers).await;

        let mut failures = Vec::new();
        let mut derived: HashMap<Blockchain, WalletData> = HashMap::new();
        for outcome in report.outcomes {
            match outcome.result {
                Ok(data) => {
                    derived.insert(outcome.blockchain, data);
                }
                Err(e) => {
                    log::warn!("⚠️  {} derivation failed for user {}: {}", outcome.blockchain, user_id, e);
                    failures.push((outcome.blockchain, e));
                }
            }
        }
        for chain in &needed {
            if !derivers.iter().any(|d| d.blockchain() == *chain) {
                failures.push((
                    *chain,
                    DerivationError::LibraryFailure(format!("no deriver configured for {}", chain)),
                ));
            }
        }

        if derived.is_empty() {
            let summary = failures
                .iter()
                .map(|(chain, e)| format!("{}: {}", chain, e))
                .collect::<Vec<_>>()
                .join("; ");
            if existing.is_empty() {
                return Err(PortfolioError::Provisioning(summary));
            }
            log::warn!("No new wallets derived for user {} ({})", user_id, summary);
            return Ok(ProvisionReport {
                wallets: existing,
                created: 0,
                failures,
                attempts: report.attempts,
            });
        }

        let mut created = 0;
        for target in missing {
            let Some(data) = derived.get(&target.blockchain) else {
                continue;
            };

            let wallet = NewWallet {
                user_id: user_id.to_string(),
                blockchain: target.blockchain,
                currency_symbol: target.currency_symbol.clone(),
                address: data.address.clone(),
                encrypted_private_key: self.cipher.encrypt(data.export_private_key().as_bytes())?,
                wallet_type: target.wallet_type.clone(),
            };

            match self.store.insert_wallet_if_absent(wallet).await {
                Ok(true) => {
                    created += 1;
                    log::info!(
                        "✅ Created {} wallet on {} for user {}",
                        target.currency_symbol,
                        target.blockchain,
                        user_id
                    );
                }
                Ok(false) | Err(StorageError::Conflict(_)) => {
                    log::debug!(
                        "{} wallet on {} already exists for user {}",
                        target.currency_symbol,
                        target.blockchain,
                        user_id
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        let wallets = self.store.list_wallets(user_id).await?;
        Ok(ProvisionReport {
            wallets,
            created,
            failures,
            attempts: report.attempts,
        })
    }
}
