//! Constructor aggregation
//!
//! A constructor scores the sum of its drivers' points, using the driver
//! assignment in the catalog at processing time.

use crate::rules::DriverPoints;
use crate::types::{ConstructorId, Driver};
use std::collections::HashMap;

/// Points per constructor for one race
pub type ConstructorPoints = HashMap<ConstructorId, i64>;

/// Sum driver points per constructor
pub fn score_constructors(driver_points: &DriverPoints, drivers: &[Driver]) -> ConstructorPoints {
    let mut points = ConstructorPoints::new();

    for driver in drivers {
        let Some(constructor_id) = &driver.constructor_id else {
            continue;
        };
        let Some(score) = driver_points.get(&driver.id) else {
            continue;
        };
        *points.entry(constructor_id.clone()).or_insert(0) += score;
    }

    points
}
