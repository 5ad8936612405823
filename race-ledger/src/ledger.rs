//! Main race ledger interface
//!
//! Ties storage, the writer actor, the roster edit lock and metrics into one
//! API. Mutations go through the actor; reads are served from snapshots.
//!
//! # Example
//!
//! ```no_run
//! use race_ledger::{Config, Ledger, RaceSubmission};
//!
//! #[tokio::main]
//! async fn main() -> race_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     let submission: RaceSubmission = serde_json::from_str(
//!         r#"{"raceName":"Bahrain","poleDriverId":"leclerc","fastestLapDriverId":"norris",
//!             "finishers":["verstappen","norris","leclerc","piastri","russell",
//!                          "hamilton","antonelli","alonso","gasly","albon"]}"#,
//!     )?;
//!     let receipt = ledger.process_race(submission).await?;
//!     println!("{} scored {} rosters", receipt.race_name, receipt.rosters_scored);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    batch::totals_from_rows,
    catalog,
    lock::RosterLock,
    metrics::Metrics,
    processor::ProcessReceipt,
    storage::{StorageStats, SETTING_ROSTERS_LOCKED},
    types::{Constructor, Driver, RaceOutcome, RaceSubmission, Roster, RosterDraft, RosterRaceScore},
    Config, Result, Storage,
};
use std::sync::Arc;
use uuid::Uuid;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Roster edit lock, shared with callers
    roster_lock: RosterLock,

    /// Metrics
    metrics: Arc<Metrics>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Arc::new(Metrics::new()?);

        if config.seed_catalog {
            catalog::seed_if_incomplete(&storage)?;
        }

        let (locked, rosters) = {
            let view = storage.view();
            (
                view.flag(SETTING_ROSTERS_LOCKED)?.unwrap_or(false),
                view.rosters()?.len(),
            )
        };
        metrics.set_rosters(rosters);

        let roster_lock = RosterLock::new(locked);
        let handle = spawn_ledger_actor(
            storage.clone(),
            metrics.clone(),
            roster_lock.clone(),
            config.rosters.clone(),
            config.mailbox_capacity,
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            rosters,
            locked,
            "Race ledger opened"
        );

        Ok(Self {
            handle,
            storage,
            roster_lock,
            metrics,
            config,
        })
    }

    // Mutations

    /// Process or reprocess a race (all-or-nothing)
    pub async fn process_race(&self, submission: RaceSubmission) -> Result<ProcessReceipt> {
        self.handle.process_race(submission).await
    }

    /// Create or update a roster
    pub async fn save_roster(&self, lock: &RosterLock, draft: RosterDraft) -> Result<Roster> {
        self.handle.save_roster(lock.clone(), draft).await
    }

    /// Delete a roster and its score rows
    pub async fn delete_roster(&self, lock: &RosterLock, roster_id: Uuid) -> Result<usize> {
        self.handle.delete_roster(lock.clone(), roster_id).await
    }

    /// Replace the driver and constructor catalog
    pub async fn replace_catalog(
        &self,
        drivers: Vec<Driver>,
        constructors: Vec<Constructor>,
    ) -> Result<()> {
        self.handle.replace_catalog(drivers, constructors).await
    }

    /// Engage or release the roster edit lock
    pub async fn set_rosters_locked(&self, locked: bool) -> Result<()> {
        self.handle.set_rosters_locked(locked).await
    }

    // Reads

    /// Race outcomes, most recently processed first
    pub fn list_races(&self) -> Result<Vec<RaceOutcome>> {
        self.storage.view().races()
    }

    /// Race outcome by ID
    pub fn get_race(&self, race_id: Uuid) -> Result<RaceOutcome> {
        self.storage.view().race(race_id)
    }

    /// Score rows of one race
    pub fn race_scores(&self, race_id: Uuid) -> Result<Vec<RosterRaceScore>> {
        let view = self.storage.view();
        view.race(race_id)?;
        view.race_scores(race_id)
    }

    /// Roster by ID
    pub fn get_roster(&self, roster_id: Uuid) -> Result<Roster> {
        self.storage.view().roster(roster_id)
    }

    /// Rosters by cumulative points (highest first), ties by name
    pub fn standings(&self) -> Result<Vec<Roster>> {
        let mut rosters = self.storage.view().rosters()?;
        rosters.sort_by(|a, b| {
            b.cumulative_points
                .cmp(&a.cumulative_points)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rosters)
    }

    /// Driver catalog
    pub fn drivers(&self) -> Result<Vec<Driver>> {
        self.storage.view().drivers()
    }

    /// Constructor catalog
    pub fn constructors(&self) -> Result<Vec<Constructor>> {
        self.storage.view().constructors()
    }

    /// Roster edit lock shared with callers
    pub fn roster_lock(&self) -> &RosterLock {
        &self.roster_lock
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Check that every roster total equals the sum of its score rows
    pub fn verify_totals(&self) -> Result<bool> {
        let view = self.storage.view();
        let totals = totals_from_rows(view.scores()?);

        let mut consistent = true;
        for roster in view.rosters()? {
            let expected = totals.get(&roster.id).copied().unwrap_or(0);
            if roster.cumulative_points != expected {
                tracing::warn!(
                    roster_id = %roster.id,
                    cached = roster.cumulative_points,
                    expected,
                    "Roster total drifted from its score rows"
                );
                consistent = false;
            }
        }

        Ok(consistent)
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
