//! Race ledger unit of work
//!
//! A [`LedgerBatch`] reads from one snapshot and stages every write into a
//! single RocksDB `WriteBatch`. Nothing is visible until [`LedgerBatch::commit`];
//! dropping the batch discards all staged writes.
//!
//! The batch keeps a working copy of every score row so totals can be
//! recomputed from the rows as they will look after commit.

use crate::storage::{Storage, StorageView, CF_RACES, CF_ROSTERS, CF_SCORES};
use crate::types::{RaceOutcome, RaceResult, Roster, RosterRaceScore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rocksdb::WriteBatch;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Outcome written by [`LedgerBatch::upsert_outcome`]
#[derive(Debug, Clone)]
pub struct UpsertedOutcome {
    /// Outcome as it will be stored
    pub outcome: RaceOutcome,

    /// Outcome it replaces, if any
    pub previous: Option<RaceOutcome>,
}

/// Σ points per roster over a set of score rows
pub fn totals_from_rows(rows: impl IntoIterator<Item = RosterRaceScore>) -> HashMap<Uuid, i64> {
    let mut totals = HashMap::new();
    for row in rows {
        *totals.entry(row.roster_id).or_insert(0) += row.points;
    }
    totals
}

/// Staged, all-or-nothing set of ledger writes
pub struct LedgerBatch<'a> {
    storage: &'a Storage,
    view: StorageView<'a>,
    batch: WriteBatch,
    /// (race_id, roster_id) -> points, as of commit
    rows: BTreeMap<(Uuid, Uuid), i64>,
    staged: usize,
    committed: bool,
}

impl<'a> LedgerBatch<'a> {
    /// Open a unit of work over the current state
    pub fn begin(storage: &'a Storage) -> Result<Self> {
        let view = storage.view();
        let rows = view
            .scores()?
            .into_iter()
            .map(|row| ((row.race_id, row.roster_id), row.points))
            .collect();

        Ok(Self {
            storage,
            view,
            batch: WriteBatch::default(),
            rows,
            staged: 0,
            committed: false,
        })
    }

    /// State as of [`LedgerBatch::begin`]
    pub fn view(&self) -> &StorageView<'a> {
        &self.view
    }

    /// Create a race outcome, or overwrite the one stored under `race_id`
    pub fn upsert_outcome(
        &mut self,
        race_id: Option<Uuid>,
        name: String,
        results: RaceResult,
        processed_at: DateTime<Utc>,
    ) -> Result<UpsertedOutcome> {
        let previous = match race_id {
            Some(id) => Some(self.view.race(id)?),
            None => None,
        };

        let outcome = RaceOutcome {
            id: race_id.unwrap_or_else(Uuid::now_v7),
            name,
            results,
            processed_at,
        };

        let cf = self.storage.cf_handle(CF_RACES)?;
        self.batch
            .put_cf(cf, outcome.id.as_bytes(), serde_json::to_vec(&outcome)?);
        self.staged += 1;

        Ok(UpsertedOutcome { outcome, previous })
    }

    /// Delete every score row of a race
    ///
    /// Returns the number of rows removed.
    pub fn clear_scores_for_race(&mut self, race_id: Uuid) -> Result<usize> {
        let cf = self.storage.cf_handle(CF_SCORES)?;
        let roster_ids: Vec<Uuid> = self
            .rows
            .range((race_id, Uuid::nil())..=(race_id, Uuid::from_u128(u128::MAX)))
            .map(|((_, roster_id), _)| *roster_id)
            .collect();

        for roster_id in &roster_ids {
            self.rows.remove(&(race_id, *roster_id));
            self.batch.delete_cf(cf, Storage::score_key(race_id, *roster_id));
            self.staged += 1;
        }

        Ok(roster_ids.len())
    }

    /// Insert the score row for (roster, race)
    ///
    /// Rows are write-once: a row that already exists must be cleared first.
    pub fn write_roster_score(&mut self, roster_id: Uuid, race_id: Uuid, points: i64) -> Result<()> {
        if self.rows.contains_key(&(race_id, roster_id)) {
            return Err(Error::InvariantViolation(format!(
                "Score row for roster {} in race {} already exists",
                roster_id, race_id
            )));
        }

        let cf = self.storage.cf_handle(CF_SCORES)?;
        self.batch
            .put_cf(cf, Storage::score_key(race_id, roster_id), points.to_be_bytes());
        self.rows.insert((race_id, roster_id), points);
        self.staged += 1;

        Ok(())
    }

    /// Rewrite every roster's cumulative total from the score rows
    pub fn recompute_all_totals(&mut self, rosters: &[Roster]) -> Result<Vec<Roster>> {
        let totals = totals_from_rows(self.rows());
        let cf = self.storage.cf_handle(CF_ROSTERS)?;

        let mut updated = Vec::with_capacity(rosters.len());
        for roster in rosters {
            let mut roster = roster.clone();
            roster.cumulative_points = totals.get(&roster.id).copied().unwrap_or(0);
            self.batch
                .put_cf(cf, roster.id.as_bytes(), bincode::serialize(&roster)?);
            self.staged += 1;
            updated.push(roster);
        }

        Ok(updated)
    }

    /// Score rows as they will look after commit
    pub fn rows(&self) -> impl Iterator<Item = RosterRaceScore> + '_ {
        self.rows
            .iter()
            .map(|(&(race_id, roster_id), &points)| RosterRaceScore {
                roster_id,
                race_id,
                points,
            })
    }

    /// Number of staged writes
    pub fn staged(&self) -> usize {
        self.staged
    }

    /// Apply every staged write atomically
    pub fn commit(mut self) -> Result<usize> {
        let batch = std::mem::take(&mut self.batch);
        self.storage.write(batch)?;
        self.committed = true;
        Ok(self.staged)
    }
}

impl Drop for LedgerBatch<'_> {
    fn drop(&mut self) {
        if !self.committed && self.staged > 0 {
            tracing::debug!(staged = self.staged, "Ledger batch discarded");
        }
    }
}
