use std::env;

use wallet_portfolio::{PortfolioConfig, WalletManager};

const USAGE: &str = "usage: portfolio-sync <user-id> [--force] [--reconcile]

environment:
  WALLET_ENCRYPTION_KEY  64 hex chars, required; encrypts stored private keys
  WALLET_DATA_DIR        wallet store directory (default ./wallets)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut user_id = None;
    let mut force = false;
    let mut reconcile = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--force" => force = true,
            "--reconcile" => reconcile = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            flag if flag.starts_with("--") => anyhow::bail!("unknown flag {}\n{}", flag, USAGE),
            _ if user_id.is_some() => anyhow::bail!("unexpected argument {}\n{}", arg, USAGE),
            _ => user_id = Some(arg),
        }
    }
    let Some(user_id) = user_id else {
        anyhow::bail!(USAGE);
    };

    let config = PortfolioConfig::from_env();
    let manager = WalletManager::new(&config)?;

    let report = manager.ensure_wallets_report(&user_id).await?;
    log::info!(
        "Wallets ready for {}: {} total, {} created",
        user_id,
        report.wallets.len(),
        report.created
    );
    for (chain, error) in &report.failures {
        log::warn!("{} wallet unavailable: {}", chain, error);
    }

    if reconcile {
        let result = manager.reconcile_duplicates(&user_id).await?;
        log::info!(
            "Reconciled duplicates: kept {}, deleted {}",
            result.kept_count,
            result.deleted_count
        );
    }

    let snapshot = manager.refresh_portfolio_snapshot(&user_id, force).await?;
    if snapshot.is_partial() {
        log::warn!("Some balances could not be refreshed and are shown as zero");
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
