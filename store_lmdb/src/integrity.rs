//! Startup checks for a data directory, run before the ledger loads its
//! latest snapshot.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use crate::environment::{META_DB, SNAPSHOTS_DB};
use crate::LmdbError;

#[derive(Debug, Default)]
pub struct IntegrityReport {
    /// Entry count per database that exists.
    pub entries: BTreeMap<&'static str, u64>,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_entries(&self) -> u64 {
        self.entries.values().sum()
    }
}

/// Walk both databases. Read failures and malformed snapshot keys are
/// collected in the report; only failing to start a read transaction is an
/// error.
pub fn check_integrity(env: &Arc<Env>) -> Result<IntegrityReport, LmdbError> {
    let rtxn = env.read_txn()?;
    let mut report = IntegrityReport::default();

    for name in [SNAPSHOTS_DB, META_DB] {
        let db = match env.open_database::<Bytes, Bytes>(&rtxn, Some(name)) {
            Ok(Some(db)) => db,
            Ok(None) => continue,
            Err(e) => {
                report.errors.push(format!("cannot open {name}: {e}"));
                continue;
            }
        };
        match count(&rtxn, db, name == SNAPSHOTS_DB) {
            Ok((entries, bad_keys)) => {
                report.entries.insert(name, entries);
                if bad_keys > 0 {
                    report
                        .errors
                        .push(format!("{bad_keys} snapshot keys are not 8-byte sequence numbers"));
                }
            }
            Err(e) => report.errors.push(format!("cannot read {name}: {e}")),
        }
    }

    if !report.is_healthy() {
        tracing::error!(errors = ?report.errors, "integrity check failed");
    }
    Ok(report)
}

fn count(rtxn: &RoTxn, db: Database<Bytes, Bytes>, sequence_keys: bool) -> Result<(u64, u64), heed::Error> {
    let (mut entries, mut bad_keys) = (0, 0);
    for entry in db.iter(rtxn)? {
        let (key, _) = entry?;
        entries += 1;
        if sequence_keys && key.len() != 8 {
            bad_keys += 1;
        }
    }
    Ok((entries, bad_keys))
}

/// A data directory is usable if it does not exist yet, is empty, or
/// already holds an LMDB data file.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() || path.join("data.mdb").exists() {
        return Ok(());
    }
    let empty = std::fs::read_dir(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?
        .next()
        .is_none();
    if empty {
        Ok(())
    } else {
        Err(format!(
            "{} is not empty but holds no data.mdb; refusing to use it as a data directory",
            path.display()
        ))
    }
}
