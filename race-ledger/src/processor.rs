//! Race processing
//!
//! One call of [`RaceProcessor::process`] is one unit of work:
//!
//! 1. validate the submission (no persisted state is touched on failure)
//! 2. upsert the race outcome, clearing its old score rows when replacing
//! 3. score drivers, constructors and every stored roster
//! 4. write one score row per roster
//! 5. recompute every roster total from the rows
//! 6. commit
//!
//! Any failure in 2-5 drops the staged batch, so nothing of the run becomes
//! visible.

use crate::aggregate::{score_constructors, ConstructorPoints};
use crate::batch::LedgerBatch;
use crate::metrics::Metrics;
use crate::roster::score_roster;
use crate::rules::{score_drivers, DriverPoints, CLASSIFIED_POSITIONS};
use crate::types::{DriverId, RaceResult, RaceSubmission};
use crate::{Error, Result, Storage};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Submission that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRace {
    /// Race to replace, if any
    pub race_id: Option<Uuid>,

    /// Trimmed race name
    pub name: String,

    /// Classified result
    pub results: RaceResult,
}

/// Summary of a committed processing run
#[derive(Debug, Clone)]
pub struct ProcessReceipt {
    /// Race ID (fresh for a new race, unchanged on replacement)
    pub race_id: Uuid,

    /// Race name as stored
    pub race_name: String,

    /// An existing race was replaced
    pub replaced: bool,

    /// Replacement carried the same result as the stored one
    pub unchanged: bool,

    /// Score rows removed for the replaced race
    pub rows_cleared: usize,

    /// Rosters that received a score row
    pub rosters_scored: usize,

    /// Per-driver points of this race
    pub driver_points: DriverPoints,

    /// Per-constructor points of this race
    pub constructor_points: ConstructorPoints,

    /// Processing timestamp
    pub processed_at: DateTime<Utc>,
}

fn required_id(value: Option<DriverId>, field: &str) -> Result<DriverId> {
    value
        .filter(|id| !id.as_str().trim().is_empty())
        .ok_or_else(|| Error::Validation(format!("{} is required", field)))
}

/// Check a submission for completeness
pub fn validate_submission(submission: RaceSubmission) -> Result<ValidatedRace> {
    let name = submission
        .race_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::Validation("Race name is required".to_string()))?
        .to_string();

    let pole_driver_id = required_id(submission.pole_driver_id, "Pole position")?;
    let fastest_lap_driver_id = required_id(submission.fastest_lap_driver_id, "Fastest lap")?;

    if submission.finishers.len() > CLASSIFIED_POSITIONS {
        return Err(Error::Validation(format!(
            "At most {} finishers can be classified, got {}",
            CLASSIFIED_POSITIONS,
            submission.finishers.len()
        )));
    }

    let finishers: Vec<DriverId> = submission
        .finishers
        .into_iter()
        .flatten()
        .filter(|id| !id.as_str().trim().is_empty())
        .collect();
    if finishers.len() != CLASSIFIED_POSITIONS {
        return Err(Error::Validation(format!(
            "All top {} positions must be filled",
            CLASSIFIED_POSITIONS
        )));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = finishers.iter().find(|id| !seen.insert(*id)) {
        return Err(Error::Validation(format!(
            "{} is classified more than once",
            duplicate
        )));
    }

    let mut seen = HashSet::new();
    let dnfs = submission
        .dnfs
        .into_iter()
        .filter(|id| !id.as_str().trim().is_empty() && seen.insert(id.clone()))
        .collect();

    Ok(ValidatedRace {
        race_id: submission.race_id,
        name,
        results: RaceResult {
            pole_driver_id,
            fastest_lap_driver_id,
            finishers,
            dnfs,
        },
    })
}

/// Runs validated submissions against the ledger
pub struct RaceProcessor {
    storage: Arc<Storage>,
    metrics: Arc<Metrics>,
}

impl RaceProcessor {
    /// Create new processor
    pub fn new(storage: Arc<Storage>, metrics: Arc<Metrics>) -> Self {
        Self { storage, metrics }
    }

    /// Process (or reprocess) a race as one all-or-nothing unit of work
    pub fn process(&self, submission: RaceSubmission) -> Result<ProcessReceipt> {
        let race = validate_submission(submission)?;
        let started = Instant::now();

        match self.run(race) {
            Ok((receipt, rows_written)) => {
                self.metrics
                    .record_race_processed(rows_written, started.elapsed().as_secs_f64());
                tracing::info!(
                    race_id = %receipt.race_id,
                    race = %receipt.race_name,
                    replaced = receipt.replaced,
                    rosters = receipt.rosters_scored,
                    "Race processed"
                );
                Ok(receipt)
            }
            Err(e) => {
                self.metrics.record_race_aborted();
                tracing::warn!(error = %e, "Race processing aborted");
                Err(e)
            }
        }
    }

    fn run(&self, race: ValidatedRace) -> Result<(ProcessReceipt, usize)> {
        let mut batch = LedgerBatch::begin(&self.storage)?;
        let drivers = batch.view().drivers()?;

        // Unknown ids score on their own but match no roster or constructor
        let known: HashSet<&DriverId> = drivers.iter().map(|d| &d.id).collect();
        let results = &race.results;
        let unknown: Vec<&DriverId> = results
            .finishers
            .iter()
            .chain(&results.dnfs)
            .chain([&results.pole_driver_id, &results.fastest_lap_driver_id])
            .filter(|id| !known.contains(id))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(drivers = ?unknown, "Race references drivers missing from the catalog");
        }

        let overlap = results.finished_and_retired();
        if !overlap.is_empty() {
            tracing::warn!(
                drivers = ?overlap,
                "Drivers listed as finishers and retirements score as retired"
            );
        }

        let processed_at = Utc::now();
        let upserted = batch.upsert_outcome(race.race_id, race.name, race.results, processed_at)?;
        let outcome = upserted.outcome;

        let (rows_cleared, unchanged) = match &upserted.previous {
            Some(previous) => (
                batch.clear_scores_for_race(outcome.id)?,
                previous.results.fingerprint()? == outcome.results.fingerprint()?,
            ),
            None => (0, false),
        };

        let driver_points = score_drivers(&outcome.results);
        let constructor_points = score_constructors(&driver_points, &drivers);
        tracing::debug!(
            race_id = %outcome.id,
            drivers = driver_points.len(),
            constructors = constructor_points.len(),
            "Entity points computed"
        );

        let rosters = batch.view().rosters()?;
        for roster in &rosters {
            let points = score_roster(roster, &driver_points, &constructor_points);
            batch.write_roster_score(roster.id, outcome.id, points)?;
        }
        batch.recompute_all_totals(&rosters)?;
        batch.commit()?;

        let receipt = ProcessReceipt {
            race_id: outcome.id,
            race_name: outcome.name,
            replaced: upserted.previous.is_some(),
            unchanged,
            rows_cleared,
            rosters_scored: rosters.len(),
            driver_points,
            constructor_points,
            processed_at,
        };
        Ok((receipt, rosters.len()))
    }
}
