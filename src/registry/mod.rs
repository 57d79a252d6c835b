//! Idempotent wallet provisioning and duplicate repair
//!
//! `WalletRegistry` fills in missing `(blockchain, currency)` wallets for a
//! user. Its check-then-insert is only an optimization: the store's unique
//! constraint decides, and `Deduplicator` cleans up whatever a store without
//! one let through.

mod dedup;
mod provisioner;
mod targets;

pub use dedup::{select_duplicates, Deduplicator, ReconcileReport};
pub use provisioner::{ProvisionReport, ProvisioningGuard, WalletRegistry};
pub use targets::{default_targets, WalletTarget, USDT_ERC20_CONTRACT, USDT_TRC20_CONTRACT};
