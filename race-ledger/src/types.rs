//! Core types for the race ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode for catalog and rosters)
//! - Stable JSON field names for persisted race outcomes
//! - Exact arithmetic (Decimal for prices)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Driver slots on a roster
pub const ROSTER_DRIVER_SLOTS: usize = 5;

/// Constructor slots on a roster
pub const ROSTER_CONSTRUCTOR_SLOTS: usize = 2;

/// Driver identifier (stable catalog key, e.g. `verstappen`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverId(String);

impl DriverId {
    /// Create new driver ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DriverId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Constructor identifier (stable catalog key, e.g. `mclaren`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructorId(String);

impl ConstructorId {
    /// Create new constructor ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstructorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConstructorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Catalog driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Driver ID
    pub id: DriverId,

    /// Display name
    pub name: String,

    /// Constructor the driver currently scores for
    pub constructor_id: Option<ConstructorId>,

    /// Budget cost
    pub price: Decimal,
}

/// Catalog constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    /// Constructor ID
    pub id: ConstructorId,

    /// Display name
    pub name: String,

    /// Budget cost
    pub price: Decimal,
}

/// Classified result of one race, persisted as JSON.
///
/// Field names are part of the stored format: history and edit flows read
/// them back into a [`RaceSubmission`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    /// Pole position holder
    pub pole_driver_id: DriverId,

    /// Fastest lap holder
    pub fastest_lap_driver_id: DriverId,

    /// Finishing order, index 0 = winner
    pub finishers: Vec<DriverId>,

    /// Retired drivers
    #[serde(default)]
    pub dnfs: Vec<DriverId>,
}

impl RaceResult {
    /// SHA-256 over the persisted JSON representation
    pub fn fingerprint(&self) -> crate::Result<[u8; 32]> {
        use sha2::{Digest, Sha256};

        let bytes = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Drivers listed both as classified finishers and as retirements
    pub fn finished_and_retired(&self) -> Vec<DriverId> {
        self.dnfs
            .iter()
            .filter(|id| self.finishers.contains(id))
            .cloned()
            .collect()
    }
}

/// Stored race outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceOutcome {
    /// Race ID (UUIDv7, stable across edits)
    pub id: Uuid,

    /// Race name (free text)
    #[serde(rename = "raceName")]
    pub name: String,

    /// Classified result
    pub results: RaceResult,

    /// Last successful processing
    pub processed_at: DateTime<Utc>,
}

impl RaceOutcome {
    /// Turn the stored outcome back into an edit payload
    pub fn to_submission(&self) -> RaceSubmission {
        RaceSubmission {
            race_id: Some(self.id),
            race_name: Some(self.name.clone()),
            pole_driver_id: Some(self.results.pole_driver_id.clone()),
            fastest_lap_driver_id: Some(self.results.fastest_lap_driver_id.clone()),
            finishers: self.results.finishers.iter().cloned().map(Some).collect(),
            dnfs: self.results.dnfs.clone(),
        }
    }
}

/// Admin payload for processing (or reprocessing) a race.
///
/// Every field is optional on the wire; completeness is checked by the
/// processor before anything is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSubmission {
    /// Existing race to replace; `None` creates a new race
    #[serde(default)]
    pub race_id: Option<Uuid>,

    /// Race name
    #[serde(default)]
    pub race_name: Option<String>,

    /// Pole position holder
    #[serde(default)]
    pub pole_driver_id: Option<DriverId>,

    /// Fastest lap holder
    #[serde(default)]
    pub fastest_lap_driver_id: Option<DriverId>,

    /// Top-10 slots, index 0 = winner; empty slots are `null`
    #[serde(default)]
    pub finishers: Vec<Option<DriverId>>,

    /// Retired drivers
    #[serde(default)]
    pub dnfs: Vec<DriverId>,
}

/// Fantasy roster (5 drivers + 2 constructors)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Roster ID
    pub id: Uuid,

    /// Owning user (opaque reference)
    pub owner: String,

    /// Display name
    pub name: String,

    /// Driver slots
    pub drivers: [Option<DriverId>; ROSTER_DRIVER_SLOTS],

    /// Constructor slots
    pub constructors: [Option<ConstructorId>; ROSTER_CONSTRUCTOR_SLOTS],

    /// Σ of this roster's score rows (recomputed, never incremented)
    pub cumulative_points: i64,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Roster {
    /// Filled driver slots
    pub fn driver_ids(&self) -> impl Iterator<Item = &DriverId> {
        self.drivers.iter().flatten()
    }

    /// Filled constructor slots
    pub fn constructor_ids(&self) -> impl Iterator<Item = &ConstructorId> {
        self.constructors.iter().flatten()
    }
}

/// Roster as submitted by its owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDraft {
    /// Existing roster to update; `None` creates a new roster
    pub id: Option<Uuid>,

    /// Owning user
    pub owner: String,

    /// Display name (defaults to "My Team")
    pub name: Option<String>,

    /// Driver slots
    pub drivers: [Option<DriverId>; ROSTER_DRIVER_SLOTS],

    /// Constructor slots
    pub constructors: [Option<ConstructorId>; ROSTER_CONSTRUCTOR_SLOTS],
}

/// Points a roster earned in one processed race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRaceScore {
    /// Roster ID
    pub roster_id: Uuid,

    /// Race ID
    pub race_id: Uuid,

    /// Signed points
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RaceResult {
        RaceResult {
            pole_driver_id: "norris".into(),
            fastest_lap_driver_id: "piastri".into(),
            finishers: vec!["norris".into(), "piastri".into()],
            dnfs: vec!["stroll".into()],
        }
    }

    #[test]
    fn test_race_result_field_names() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert_eq!(json["poleDriverId"], "norris");
        assert_eq!(json["fastestLapDriverId"], "piastri");
        assert_eq!(json["finishers"][1], "piastri");
        assert_eq!(json["dnfs"][0], "stroll");
    }

    #[test]
    fn test_outcome_to_submission() {
        let outcome = RaceOutcome {
            id: Uuid::now_v7(),
            name: "Bahrain".to_string(),
            results: sample_result(),
            processed_at: Utc::now(),
        };

        let submission = outcome.to_submission();
        assert_eq!(submission.race_id, Some(outcome.id));
        assert_eq!(submission.race_name.as_deref(), Some("Bahrain"));
        assert_eq!(submission.finishers[0], Some(DriverId::new("norris")));
        assert_eq!(submission.dnfs, vec![DriverId::new("stroll")]);
    }

    #[test]
    fn test_submission_accepts_missing_fields() {
        let submission: RaceSubmission =
            serde_json::from_str(r#"{"raceName":"Monaco","finishers":["leclerc",null]}"#).unwrap();
        assert_eq!(submission.race_id, None);
        assert_eq!(submission.pole_driver_id, None);
        assert_eq!(submission.finishers, vec![Some(DriverId::new("leclerc")), None]);
        assert!(submission.dnfs.is_empty());
    }

    #[test]
    fn test_fingerprint_tracks_payload() {
        let a = sample_result();
        let mut b = sample_result();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.dnfs.clear();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_finished_and_retired() {
        let mut result = sample_result();
        assert!(result.finished_and_retired().is_empty());

        result.dnfs.push("piastri".into());
        assert_eq!(result.finished_and_retired(), vec![DriverId::new("piastri")]);
    }

    #[test]
    fn test_roster_filled_slots() {
        let mut roster = Roster {
            id: Uuid::now_v7(),
            owner: "ana@example.com".to_string(),
            name: "My Team".to_string(),
            drivers: [
                Some("norris".into()),
                Some("piastri".into()),
                Some("albon".into()),
                Some("ocon".into()),
                None,
            ],
            constructors: [Some("mclaren".into()), Some("haas".into())],
            cumulative_points: 0,
            created_at: Utc::now(),
        };

        assert_eq!(roster.driver_ids().count(), 4);
        assert_eq!(roster.constructor_ids().count(), 2);

        roster.drivers[4] = Some("bearman".into());
        assert_eq!(roster.driver_ids().count(), 5);
        assert_eq!(roster.driver_ids().last(), Some(&DriverId::new("bearman")));
    }
}
