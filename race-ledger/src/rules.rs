//! Point rules for a single race
//!
//! | Event                            | Points            |
//! |----------------------------------|-------------------|
//! | Finishing position `i` (0-based) | `10 - i` in top 10 |
//! | Fastest lap, classified top 10   | +5                |
//! | Pole position                    | +5                |
//! | Retirement (DNF)                 | exactly -5        |
//!
//! A retirement overwrites every other rule for that driver. Drivers not
//! mentioned in the result get no entry.

use crate::types::{DriverId, RaceResult};
use std::collections::HashMap;

/// Positions that score base points
pub const CLASSIFIED_POSITIONS: usize = 10;

/// Bonus for pole position
pub const POLE_BONUS: i64 = 5;

/// Bonus for fastest lap inside the classified positions
pub const FASTEST_LAP_BONUS: i64 = 5;

/// Fixed score for a retirement
pub const DNF_POINTS: i64 = -5;

/// Points per driver for one race
pub type DriverPoints = HashMap<DriverId, i64>;

/// Base points for a 0-based finishing index
pub fn base_points(index: usize) -> i64 {
    if index < CLASSIFIED_POSITIONS {
        (CLASSIFIED_POSITIONS - index) as i64
    } else {
        0
    }
}

/// Evaluate the point rules for one race result
pub fn score_drivers(result: &RaceResult) -> DriverPoints {
    let mut points = DriverPoints::new();

    for (index, driver_id) in result.finishers.iter().enumerate() {
        let mut score = base_points(index);
        if index < CLASSIFIED_POSITIONS && *driver_id == result.fastest_lap_driver_id {
            score += FASTEST_LAP_BONUS;
        }
        if *driver_id == result.pole_driver_id {
            score += POLE_BONUS;
        }
        points.insert(driver_id.clone(), score);
    }

    // Pole counts even without a classified finish
    points
        .entry(result.pole_driver_id.clone())
        .or_insert(POLE_BONUS);

    for driver_id in &result.dnfs {
        points.insert(driver_id.clone(), DNF_POINTS);
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<DriverId> {
        names.iter().map(|n| DriverId::new(*n)).collect()
    }

    fn result(finishers: &[&str], pole: &str, fastest_lap: &str, dnfs: &[&str]) -> RaceResult {
        RaceResult {
            pole_driver_id: pole.into(),
            fastest_lap_driver_id: fastest_lap.into(),
            finishers: ids(finishers),
            dnfs: ids(dnfs),
        }
    }

    const GRID: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];

    #[test]
    fn test_base_points() {
        assert_eq!(base_points(0), 10);
        assert_eq!(base_points(9), 1);
        assert_eq!(base_points(10), 0);
        assert_eq!(base_points(15), 0);
    }

    #[test]
    fn test_full_scenario() {
        let points = score_drivers(&result(&GRID, "C", "A", &[]));

        let expected = [
            ("A", 15),
            ("B", 9),
            ("C", 13),
            ("D", 7),
            ("E", 6),
            ("F", 5),
            ("G", 4),
            ("H", 3),
            ("I", 2),
            ("J", 1),
        ];
        assert_eq!(points.len(), expected.len());
        for (driver, score) in expected {
            assert_eq!(points[&DriverId::new(driver)], score, "driver {}", driver);
        }
    }

    #[test]
    fn test_pole_outside_classification() {
        let points = score_drivers(&result(&GRID, "K", "A", &[]));
        assert_eq!(points[&DriverId::new("K")], POLE_BONUS);
    }

    #[test]
    fn test_fastest_lap_outside_classification_scores_nothing() {
        let points = score_drivers(&result(&GRID, "A", "K", &[]));
        assert!(!points.contains_key(&DriverId::new("K")));
        assert_eq!(points[&DriverId::new("A")], 15);
    }

    #[test]
    fn test_fastest_lap_beyond_top_ten() {
        let mut finishers = GRID.to_vec();
        finishers.push("K");
        let points = score_drivers(&result(&finishers, "A", "K", &[]));
        assert_eq!(points[&DriverId::new("K")], 0);
    }

    #[test]
    fn test_dnf_overwrites_classification() {
        let points = score_drivers(&result(&GRID, "F", "F", &["F"]));
        assert_eq!(points[&DriverId::new("F")], DNF_POINTS);
    }

    #[test]
    fn test_dnf_only_driver() {
        let points = score_drivers(&result(&GRID, "A", "A", &["K"]));
        assert_eq!(points[&DriverId::new("K")], -5);
        assert_eq!(points[&DriverId::new("A")], 20);
    }

    #[test]
    fn test_unmentioned_driver_has_no_entry() {
        let points = score_drivers(&result(&GRID, "A", "B", &["K"]));
        assert!(!points.contains_key(&DriverId::new("Z")));
        assert_eq!(points.len(), 11);
    }
}
