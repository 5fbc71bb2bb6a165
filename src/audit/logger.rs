//! Audit logger for the append-only operation log
//!
//! Each entry is written as a single JSON line and flushed immediately.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Money};

use super::entry::AuditEntry;

/// Writes operation log entries to a JSON-lines file
pub struct AuditLogger {
    log_path: PathBuf,
    /// Serializes appends from concurrent commits
    append: Mutex<()>,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            append: Mutex::new(()),
        }
    }

    /// Append one entry
    pub fn log(&self, entry: &AuditEntry) -> LedgerResult<()> {
        self.log_batch(std::slice::from_ref(entry))
    }

    /// Append several entries, flushing once at the end
    pub fn log_batch(&self, entries: &[AuditEntry]) -> LedgerResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let _append = self
            .append
            .lock()
            .map_err(|_| LedgerError::Io("Audit log writer poisoned".into()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| LedgerError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut buffer = String::new();
        for entry in entries {
            let json = serde_json::to_string(entry)
                .map_err(|e| LedgerError::Json(format!("Failed to serialize audit entry: {}", e)))?;
            buffer.push_str(&json);
            buffer.push('\n');
        }

        file.write_all(buffer.as_bytes())
            .map_err(|e| LedgerError::Io(format!("Failed to write audit entry: {}", e)))?;
        file.flush()
            .map_err(|e| LedgerError::Io(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Read all entries, oldest first
    pub fn read_all(&self) -> LedgerResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| LedgerError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                LedgerError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                LedgerError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Read the most recent N entries
    pub fn read_recent(&self, count: usize) -> LedgerResult<Vec<AuditEntry>> {
        let mut all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries.split_off(start))
    }

    /// Sum of logged balance deltas per account
    pub fn net_postings(&self) -> LedgerResult<HashMap<AccountId, Money>> {
        let mut totals: HashMap<AccountId, Money> = HashMap::new();
        for entry in self.read_all()? {
            for posting in entry.postings {
                *totals.entry(posting.account_id).or_default() += posting.delta;
            }
        }
        Ok(totals)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{EntityType, Operation};
    use crate::models::Posting;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp_dir.path().join("audit.log"));
        (logger, temp_dir)
    }

    #[test]
    fn test_log_and_read() {
        let (logger, _temp) = create_test_logger();
        let entry = AuditEntry::create(EntityType::Account, "acc-1", None, &json!({"n": 1}));

        logger.log(&entry).unwrap();

        let entries = logger.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Create);
    }

    #[test]
    fn test_read_recent() {
        let (logger, _temp) = create_test_logger();
        let entries: Vec<_> = (0..10)
            .map(|i| {
                AuditEntry::create(EntityType::Account, format!("acc-{}", i), None, &json!({}))
            })
            .collect();
        logger.log_batch(&entries).unwrap();

        let recent = logger.read_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].entity_id, "acc-7");
        assert_eq!(recent[2].entity_id, "acc-9");
    }

    #[test]
    fn test_empty_log() {
        let (logger, _temp) = create_test_logger();
        assert!(logger.read_all().unwrap().is_empty());
        assert!(logger.net_postings().unwrap().is_empty());
    }

    #[test]
    fn test_net_postings_sums_per_account() {
        let (logger, _temp) = create_test_logger();
        let a = AccountId::new();
        let b = AccountId::new();

        let first = AuditEntry::create(EntityType::Transaction, "txn-1", None, &json!({}))
            .with_postings([
                Posting { account_id: a, delta: Money::from_cents(-150) },
                Posting { account_id: b, delta: Money::from_cents(150) },
            ]);
        let second = AuditEntry::delete(EntityType::Transaction, "txn-1", None, &json!({}))
            .with_postings([
                Posting { account_id: a, delta: Money::from_cents(150) },
                Posting { account_id: b, delta: Money::from_cents(-150) },
            ]);
        logger.log(&first).unwrap();
        logger.log(&second).unwrap();

        let totals = logger.net_postings().unwrap();
        assert_eq!(totals[&a], Money::zero());
        assert_eq!(totals[&b], Money::zero());
    }

    #[test]
    fn test_survives_restart() {
        let (logger, temp) = create_test_logger();
        logger
            .log(&AuditEntry::create(EntityType::Account, "acc-1", None, &json!({})))
            .unwrap();

        let logger2 = AuditLogger::new(temp.path().join("audit.log"));
        assert_eq!(logger2.read_all().unwrap().len(), 1);
    }
}
