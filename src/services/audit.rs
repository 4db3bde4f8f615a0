use crate::error::{LedgerError, LedgerResult};
use crate::models::{Bet, PayoutEntry, TxRef};
use crate::services::processor::{Applied, AppliedOpcode, BlockReport, Rejection};
use crate::services::settlement::SettlementBatch;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "bet_placed", "opcode_applied", "event_settled", etc.
    pub block_height: u64,
    pub event_id: Option<u32>,
    pub address: Option<String>,
    pub tx_ref: Option<TxRef>,
    pub details: serde_json::Value,
}

/// Audit trail service writing one JSON line per ledger action
pub struct AuditTrailService {
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl AuditTrailService {
    /// Create a new audit trail service
    pub fn new(log_directory: PathBuf) -> LedgerResult<Self> {
        // Ensure directory exists
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| LedgerError::Audit(format!("Failed to create log directory: {}", e)))?;

        // Create log file with date
        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("audit_{}.log", date));

        // Open file in append mode
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| LedgerError::Audit(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> LedgerResult<()> {
        let json = serde_json::to_string(&entry)
            .map_err(|e| LedgerError::Audit(format!("Failed to serialize audit entry: {}", e)))?;

        let mut file = self.file_handle.lock().await;
        writeln!(file, "{}", json)
            .map_err(|e| LedgerError::Audit(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| LedgerError::Audit(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Log everything a connected block did, in processing order
    pub async fn log_block(&self, report: &BlockReport) -> LedgerResult<()> {
        for applied in &report.applied {
            match &applied.effect {
                Applied::BetPlaced(bet) => self.log_bet_placed(bet).await?,
                _ => self.log_opcode_applied(report.height, applied).await?,
            }
        }

        for rejection in &report.rejected {
            self.log_opcode_rejected(report.height, rejection).await?;
        }

        for batch in &report.settlements {
            self.log_event_settled(batch).await?;
            for settled in &batch.bets {
                for payout in &settled.payouts {
                    self.log_payout(payout).await?;
                }
            }
        }

        Ok(())
    }

    /// Log bet placement
    pub async fn log_bet_placed(&self, bet: &Bet) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "bet_placed".to_string(),
            block_height: bet.placement_height,
            event_id: Some(bet.event_id),
            address: Some(bet.bettor.clone()),
            tx_ref: Some(bet.tx_ref),
            details: serde_json::json!({
                "outcome": bet.outcome,
                "stake": bet.stake.to_string(),
                "placement_version": bet.placement_version,
            }),
        };

        self.log(entry).await
    }

    pub async fn log_opcode_applied(&self, height: u64, applied: &AppliedOpcode) -> LedgerResult<()> {
        let event_id = match applied.effect {
            Applied::EventCreated { event_id }
            | Applied::LineUpdated { event_id }
            | Applied::ResultPosted { event_id, .. } => Some(event_id),
            Applied::BetPlaced(ref bet) => Some(bet.event_id),
            Applied::MappingRegistered => None,
        };

        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "opcode_applied".to_string(),
            block_height: height,
            event_id,
            address: Some(applied.sender.clone()),
            tx_ref: Some(applied.tx_ref),
            details: serde_json::json!({
                "opcode": applied.kind.as_str(),
                "effect": applied.effect,
            }),
        };

        self.log(entry).await
    }

    pub async fn log_opcode_rejected(&self, height: u64, rejection: &Rejection) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "opcode_rejected".to_string(),
            block_height: height,
            event_id: None,
            address: Some(rejection.sender.clone()),
            tx_ref: Some(rejection.tx_ref),
            details: serde_json::json!({
                "code": rejection.code.as_u16(),
                "reason": rejection.code.as_str(),
                "message": rejection.message,
            }),
        };

        self.log(entry).await
    }

    /// Log event settlement
    pub async fn log_event_settled(&self, batch: &SettlementBatch) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "event_settled".to_string(),
            block_height: batch.height,
            event_id: Some(batch.event_id),
            address: None,
            tx_ref: None,
            details: serde_json::json!({
                "version": batch.version,
                "bets": batch.bets.len(),
                "payouts": batch.payout_count(),
                "total_paid": batch.total_paid().to_string(),
            }),
        };

        self.log(entry).await
    }

    /// Log a payout with the exact bet reference it settles
    pub async fn log_payout(&self, payout: &PayoutEntry) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "payout_recorded".to_string(),
            block_height: payout.settlement_height,
            event_id: Some(payout.event_id),
            address: Some(payout.bettor.clone()),
            tx_ref: Some(payout.bet_ref),
            details: serde_json::json!({
                "payout_type": payout.payout_type.as_str(),
                "amount": payout.amount.to_string(),
            }),
        };

        self.log(entry).await
    }
}
