//! One CLI invocation's view of the persisted ledger.

use std::cell::Cell;
use std::sync::Arc;

use anyhow::{bail, Context};
use govlock_governance::GovernanceClient;
use govlock_ledger::{GenesisConfig, Ledger, SharedLedger};
use govlock_store::SnapshotStore;
use govlock_store_lmdb::{integrity, LmdbEnvironment, LmdbSnapshotStore, Migrator};
use govlock_types::{Address, SystemClock};

use crate::config::CliConfig;
use crate::resolve::account;

pub struct Session {
    store: LmdbSnapshotStore,
    ledger: SharedLedger,
    actor: Address,
    keep_snapshots: u64,
    initialised: bool,
    /// Sequence number of the newest snapshot on disk.
    persisted: Cell<Option<u64>>,
}

impl Session {
    /// Open the data directory, run migrations and load the latest snapshot.
    /// An empty directory gets the genesis deployment in memory; it is only
    /// written by [`Session::commit`].
    pub fn open(config: &CliConfig, advance_secs: u64) -> anyhow::Result<Self> {
        integrity::check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating {}", config.data_dir.display()))?;

        let env = LmdbEnvironment::open_default(&config.data_dir)?;
        let report = integrity::check_integrity(env.env())?;
        if !report.is_healthy() {
            bail!("data directory is corrupt: {}", report.errors.join("; "));
        }
        Migrator::run(&env.meta_store()?)?;
        let store = env.snapshot_store()?;
        let persisted = store.latest_snapshot()?.map(|(seq, _)| seq);

        let genesis = match &config.genesis {
            Some(path) => GenesisConfig::from_toml_file(path)?,
            None => GenesisConfig::preset(),
        };
        if advance_secs > 0 {
            tracing::warn!(advance_secs, "clock shifted forward");
        }
        let clock = Arc::new(SystemClock::with_offset(advance_secs));
        let ledger = Ledger::open(&store, &genesis, clock)?;

        Ok(Self {
            store,
            ledger: SharedLedger::new(ledger),
            actor: account(&config.actor)?,
            keep_snapshots: config.keep_snapshots,
            initialised: persisted.is_some(),
            persisted: Cell::new(persisted),
        })
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn require_initialised(&self) -> anyhow::Result<()> {
        if !self.initialised {
            bail!("data directory is empty; run `govlock init` first");
        }
        Ok(())
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn client(&self) -> anyhow::Result<GovernanceClient> {
        Ok(GovernanceClient::new(self.ledger.clone(), self.actor)?)
    }

    /// Persist the current state and prune old snapshots. A ledger with no
    /// new transactions since the last snapshot is not written again.
    pub fn commit(&self) -> anyhow::Result<u64> {
        let ledger = self.ledger.lock();
        if self.persisted.get() == Some(ledger.seq()) {
            tracing::debug!(seq = ledger.seq(), "nothing to commit");
            return Ok(ledger.seq());
        }
        let seq = ledger.persist(&self.store)?;
        drop(ledger);
        self.persisted.set(Some(seq));
        let pruned = self
            .store
            .prune_before(seq.saturating_sub(self.keep_snapshots))?;
        tracing::debug!(seq, pruned, "ledger committed");
        Ok(seq)
    }
}
