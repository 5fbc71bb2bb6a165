//! Durable JSON table files
//!
//! Each ledger table (accounts, transactions, categories) lives in one JSON
//! file that is replaced whole on every commit. A replacement goes through a
//! sibling temp file, an fsync, a rename, and on unix an fsync of the
//! directory, so after a crash the file holds either the previous commit or
//! the new one.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::LedgerError;

/// Handle on one table file
#[derive(Debug, Clone)]
pub struct DataFile {
    path: PathBuf,
}

impl DataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an in-flight replacement is written before the rename
    fn staging_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Read the table, or its default if it was never written
    ///
    /// A staging file left behind by an interrupted write is discarded: its
    /// rename never happened, so the table file is still the last commit.
    pub fn load<T>(&self) -> Result<T, LedgerError>
    where
        T: DeserializeOwned + Default,
    {
        let staging = self.staging_path();
        if staging.is_file() {
            warn!(file = %staging.display(), "discarding interrupted write");
            fs::remove_file(&staging).map_err(|e| failed("remove", &staging, e))?;
        }

        if !self.path.exists() {
            return Ok(T::default());
        }

        let file = File::open(&self.path).map_err(|e| failed("open", &self.path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| failed("parse", &self.path, e))
    }

    /// Replace the table with `data`
    pub fn store<T: Serialize>(&self, data: &T) -> Result<(), LedgerError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| failed("create directory", dir, e))?;

        let staging = self.staging_path();
        if let Err(err) = write_synced(&staging, data) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }

        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(failed("replace", &self.path, e));
        }

        sync_dir(dir)
    }
}

fn write_synced<T: Serialize>(path: &Path, data: &T) -> Result<(), LedgerError> {
    let file = File::create(path).map_err(|e| failed("create", path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data).map_err(|e| failed("serialize", path, e))?;
    writer.flush().map_err(|e| failed("flush", path, e))?;
    writer.get_ref().sync_all().map_err(|e| failed("sync", path, e))
}

/// Make a completed rename durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), LedgerError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| failed("sync directory", dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), LedgerError> {
    Ok(())
}

fn failed(action: &str, path: &Path, err: impl Display) -> LedgerError {
    LedgerError::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
}
