//! Race Ledger
//!
//! Fantasy race scoring: race outcomes are turned into per-driver and
//! per-constructor points, then into one score row per roster, and every
//! roster total is recomputed from those rows.
//!
//! # Architecture
//!
//! - **Pure scoring**: `rules` → `aggregate` → `roster`, no I/O
//! - **Unit of work**: one RocksDB `WriteBatch` per processing run, dropped on failure
//! - **Single Writer**: one actor task applies every mutation in order
//! - **Snapshots**: readers see the state before or after a run, never between
//!
//! # Invariants
//!
//! - Derived totals: a roster's cumulative points equal the sum of its score rows
//! - Idempotent reprocessing: same race id and payload → same rows and totals
//! - No stale rows: replacing a race regenerates all of its rows
//! - All-or-nothing: an aborted run leaves no visible write

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod actor;
pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod metrics;
pub mod processor;
pub mod roster;
pub mod rules;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use ledger::Ledger;
pub use lock::RosterLock;
pub use processor::ProcessReceipt;
pub use storage::Storage;
pub use types::{
    Constructor, ConstructorId, Driver, DriverId, RaceOutcome, RaceResult, RaceSubmission, Roster,
    RosterDraft, RosterRaceScore,
};
