//! Default driver and constructor catalog
//!
//! The 2026 grid. Written on open when the stored driver catalog has fewer
//! entries than the grid.

use crate::types::{Constructor, ConstructorId, Driver};
use crate::{Result, Storage};
use rust_decimal::Decimal;

/// (id, name, constructor, price in tenths)
const GRID_DRIVERS: [(&str, &str, &str, i64); 22] = [
    ("verstappen", "Max Verstappen", "red_bull", 277),
    ("hadjar", "Isack Hadjar", "red_bull", 151),
    ("norris", "Lando Norris", "mclaren", 272),
    ("piastri", "Oscar Piastri", "mclaren", 255),
    ("leclerc", "Charles Leclerc", "ferrari", 228),
    ("hamilton", "Lewis Hamilton", "ferrari", 225),
    ("russell", "George Russell", "mercedes", 274),
    ("antonelli", "Kimi Antonelli", "mercedes", 232),
    ("sainz", "Carlos Sainz", "williams", 118),
    ("albon", "Alexander Albon", "williams", 116),
    ("alonso", "Fernando Alonso", "aston_martin", 100),
    ("stroll", "Lance Stroll", "aston_martin", 80),
    ("gasly", "Pierre Gasly", "alpine", 120),
    ("colapinto", "Franco Colapinto", "alpine", 62),
    ("ocon", "Esteban Ocon", "haas", 73),
    ("bearman", "Oliver Bearman", "haas", 74),
    ("perez", "Sergio Perez", "cadillac", 60),
    ("bottas", "Valtteri Bottas", "cadillac", 59),
    ("hulkenberg", "Nico Hulkenberg", "audi", 68),
    ("bortoleto", "Gabriel Bortoleto", "audi", 64),
    ("lawson", "Liam Lawson", "rb", 65),
    ("lindblad", "Arvid Lindblad", "rb", 62),
];

/// (id, name, price in tenths)
const GRID_CONSTRUCTORS: [(&str, &str, i64); 11] = [
    ("mclaren", "McLaren", 289),
    ("ferrari", "Ferrari", 233),
    ("red_bull", "Red Bull Racing", 282),
    ("mercedes", "Mercedes", 293),
    ("aston_martin", "Aston Martin", 103),
    ("williams", "Williams", 120),
    ("alpine", "Alpine", 125),
    ("haas", "Haas F1 Team", 74),
    ("cadillac", "Cadillac", 60),
    ("audi", "Audi", 66),
    ("rb", "Racing Bulls", 63),
];

/// Default grid drivers
pub fn default_drivers() -> Vec<Driver> {
    GRID_DRIVERS
        .iter()
        .map(|(id, name, constructor, tenths)| Driver {
            id: (*id).into(),
            name: name.to_string(),
            constructor_id: Some(ConstructorId::new(*constructor)),
            price: Decimal::new(*tenths, 1),
        })
        .collect()
}

/// Default grid constructors
pub fn default_constructors() -> Vec<Constructor> {
    GRID_CONSTRUCTORS
        .iter()
        .map(|(id, name, tenths)| Constructor {
            id: (*id).into(),
            name: name.to_string(),
            price: Decimal::new(*tenths, 1),
        })
        .collect()
}

/// Write the default grid if the stored catalog is incomplete.
///
/// Returns true when the catalog was (re)seeded.
pub fn seed_if_incomplete(storage: &Storage) -> Result<bool> {
    let stored = storage.view().drivers()?.len();
    if stored >= GRID_DRIVERS.len() {
        return Ok(false);
    }

    tracing::info!(stored, grid = GRID_DRIVERS.len(), "Seeding driver catalog");
    storage.replace_catalog(&default_drivers(), &default_constructors())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use std::collections::HashSet;

    #[test]
    fn test_every_driver_has_a_known_constructor() {
        let constructors: HashSet<_> = default_constructors().into_iter().map(|c| c.id).collect();
        for driver in default_drivers() {
            let team = driver.constructor_id.expect("grid drivers have a constructor");
            assert!(constructors.contains(&team), "{} drives for {}", driver.id, team);
        }
    }

    #[test]
    fn test_two_drivers_per_constructor() {
        let drivers = default_drivers();
        for constructor in default_constructors() {
            let count = drivers
                .iter()
                .filter(|d| d.constructor_id.as_ref() == Some(&constructor.id))
                .count();
            assert_eq!(count, 2, "{}", constructor.id);
        }
    }

    #[test]
    fn test_seed_if_incomplete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Storage::open(&config).unwrap();

        assert!(seed_if_incomplete(&storage).unwrap());
        assert!(!seed_if_incomplete(&storage).unwrap());

        let view = storage.view();
        assert_eq!(view.drivers().unwrap().len(), 22);
        assert_eq!(view.constructors().unwrap().len(), 11);
    }
}
