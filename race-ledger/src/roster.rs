//! Roster scoring and roster rules
//!
//! Scoring never validates a roster: an empty slot simply contributes 0.
//! Completeness, distinctness and budget are enforced when a roster is saved.

use crate::aggregate::ConstructorPoints;
use crate::config::RosterConfig;
use crate::rules::DriverPoints;
use crate::types::{Constructor, Driver, Roster, RosterDraft};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Default roster name when the owner gives none
pub const DEFAULT_ROSTER_NAME: &str = "My Team";

/// Points a roster earns for one race
pub fn score_roster(
    roster: &Roster,
    driver_points: &DriverPoints,
    constructor_points: &ConstructorPoints,
) -> i64 {
    let drivers: i64 = roster
        .driver_ids()
        .map(|id| driver_points.get(id).copied().unwrap_or(0))
        .sum();
    let constructors: i64 = roster
        .constructor_ids()
        .map(|id| constructor_points.get(id).copied().unwrap_or(0))
        .sum();

    drivers + constructors
}

/// Check a draft against the catalog and roster rules.
///
/// Returns the total price of the selection.
pub fn validate_draft(
    draft: &RosterDraft,
    drivers: &[Driver],
    constructors: &[Constructor],
    rules: &RosterConfig,
) -> Result<Decimal> {
    if draft.owner.trim().is_empty() {
        return Err(Error::Validation("Roster owner is required".to_string()));
    }

    if draft.drivers.iter().any(Option::is_none) || draft.constructors.iter().any(Option::is_none)
    {
        return Err(Error::Validation(
            "Roster is incomplete: 5 drivers and 2 constructors are required".to_string(),
        ));
    }

    let driver_prices: HashMap<_, _> = drivers.iter().map(|d| (&d.id, d.price)).collect();
    let constructor_prices: HashMap<_, _> =
        constructors.iter().map(|c| (&c.id, c.price)).collect();

    let mut spend = Decimal::ZERO;

    let mut seen_drivers = HashSet::new();
    for id in draft.drivers.iter().flatten() {
        if !seen_drivers.insert(id) {
            return Err(Error::Validation(format!("Driver {} selected twice", id)));
        }
        spend += *driver_prices
            .get(id)
            .ok_or_else(|| Error::EntityNotFound(format!("driver {}", id)))?;
    }

    let mut seen_constructors = HashSet::new();
    for id in draft.constructors.iter().flatten() {
        if !seen_constructors.insert(id) {
            return Err(Error::Validation(format!("Constructor {} selected twice", id)));
        }
        spend += *constructor_prices
            .get(id)
            .ok_or_else(|| Error::EntityNotFound(format!("constructor {}", id)))?;
    }

    if spend > rules.budget_limit {
        return Err(Error::Validation(format!(
            "Roster costs {} which exceeds the budget of {}",
            spend, rules.budget_limit
        )));
    }

    Ok(spend)
}

/// Materialise a validated draft.
///
/// An update keeps the ledger-derived total and creation time of the
/// existing roster; a new roster starts at zero.
pub fn build_roster(draft: RosterDraft, existing: Option<&Roster>, now: DateTime<Utc>) -> Roster {
    let name = draft
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROSTER_NAME.to_string());

    Roster {
        id: existing.map(|r| r.id).unwrap_or_else(Uuid::now_v7),
        owner: draft.owner,
        name,
        drivers: draft.drivers,
        constructors: draft.constructors,
        cumulative_points: existing.map(|r| r.cumulative_points).unwrap_or(0),
        created_at: existing.map(|r| r.created_at).unwrap_or(now),
    }
}
