//! Ledger replay tool
//!
//! Replays a JSON file of confirmed blocks from genesis, writes the audit
//! trail, reconciles the payout log and prints the resulting state root.

use anyhow::{bail, Context, Result};
use sportsbook_ledger::models::Block;
use sportsbook_ledger::services::{reconcile, AuditTrailService};
use sportsbook_ledger::{AppConfig, BlockProcessor, ChainState, OracleRegistry, StateManager};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!(e)
    })?;

    // Initialize tracing/logging with config
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sportsbook_ledger={}", config.log_level).into());
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Ledger replay starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Blocks file: {:?}", config.blocks_file);
    info!(
        "Chain params: odds_divisor={}, betx_permille={}, stake {}..={}",
        config.chain.odds_divisor,
        config.chain.betx_permille,
        config.chain.min_bet,
        config.chain.max_bet
    );

    if config.chain.oracle_addresses.is_empty() {
        warn!("No ORACLE_ADDRESSES configured; every oracle opcode will be rejected");
    }

    let raw = tokio::fs::read_to_string(&config.blocks_file)
        .await
        .with_context(|| format!("Failed to read {:?}", config.blocks_file))?;
    let blocks: Vec<Block> =
        serde_json::from_str(&raw).context("Failed to parse blocks file")?;
    info!("Loaded {} blocks", blocks.len());

    let oracles = Arc::new(OracleRegistry::with_addresses(
        config.chain.oracle_addresses.iter().cloned(),
    ));
    let processor = BlockProcessor::new(config.chain.clone(), oracles);
    let audit = AuditTrailService::new(config.audit_dir.clone())?;

    let mut state = ChainState::new();
    for block in &blocks {
        let report = processor.connect_block(&mut state, block).map_err(|e| {
            error!("Replay halted at block {}: {}", block.height, e);
            e
        })?;
        audit.log_block(&report).await?;
    }

    let reconciliation = reconcile(&state);
    let root = StateManager::new().state_root(&state);

    info!(
        "Replayed to height {:?}: {} events, {} bets, {} payouts",
        state.tip_height,
        state.events.len(),
        state.bets.len(),
        state.payouts.len()
    );
    println!("{}", root.root_hex());

    if !reconciliation.is_clean() {
        for issue in &reconciliation.issues {
            error!("Unreconciled bet {}: {}", issue.bet_ref, issue.detail);
        }
        bail!(
            "Reconciliation found {} issues",
            reconciliation.issues.len()
        );
    }

    Ok(())
}
