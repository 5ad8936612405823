//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `drivers` - Driver catalog (key: driver_id)
//! - `constructors` - Constructor catalog (key: constructor_id)
//! - `races` - Race outcomes as JSON (key: race_id)
//! - `rosters` - Fantasy rosters (key: roster_id)
//! - `scores` - Per-roster race points (key: race_id || roster_id, value: i64 BE)
//! - `settings` - Admin flags (key: setting name)
//!
//! Every mutation is a single `WriteBatch`. Reads that span several keys go
//! through a [`StorageView`], which pins a RocksDB snapshot, so a reader sees
//! either the state before a batch or the state after it.

use crate::{
    error::{Error, Result},
    types::{Constructor, Driver, RaceOutcome, Roster, RosterRaceScore},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, Snapshot, WriteBatch,
    DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
pub(crate) const CF_DRIVERS: &str = "drivers";
pub(crate) const CF_CONSTRUCTORS: &str = "constructors";
pub(crate) const CF_RACES: &str = "races";
pub(crate) const CF_ROSTERS: &str = "rosters";
pub(crate) const CF_SCORES: &str = "scores";
pub(crate) const CF_SETTINGS: &str = "settings";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_DRIVERS,
    CF_CONSTRUCTORS,
    CF_RACES,
    CF_ROSTERS,
    CF_SCORES,
    CF_SETTINGS,
];

/// Setting key for the global roster edit lock
pub(crate) const SETTING_ROSTERS_LOCKED: &str = "rosters_locked";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Self::cf_options(name)))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(
            "Opened RocksDB at {:?} with {} column families",
            path,
            COLUMN_FAMILIES
                .iter()
                .filter(|name| db.cf_handle(name).is_some())
                .count()
        );

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options(name: &str) -> Options {
        let mut opts = Options::default();
        match name {
            // Scanned by race prefix on every reprocess
            CF_SCORES => {
                opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                let mut block_opts = rocksdb::BlockBasedOptions::default();
                block_opts.set_bloom_filter(10.0, false);
                opts.set_block_based_table_factory(&block_opts);
            }
            _ => opts.set_compression_type(rocksdb::DBCompressionType::Lz4),
        }
        opts
    }

    pub(crate) fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Consistent point-in-time read view
    pub fn view(&self) -> StorageView<'_> {
        StorageView {
            storage: self,
            snapshot: self.db.snapshot(),
        }
    }

    /// Atomic commit of a staged batch
    pub(crate) fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch)?;
        Ok(())
    }

    // Key helpers

    pub(crate) fn score_key(race_id: Uuid, roster_id: Uuid) -> [u8; 32] {
        let mut key = [0u8; 32];
        key[..16].copy_from_slice(race_id.as_bytes());
        key[16..].copy_from_slice(roster_id.as_bytes());
        key
    }

    fn split_score_key(key: &[u8]) -> Result<(Uuid, Uuid)> {
        if key.len() != 32 {
            return Err(Error::Storage(format!(
                "Score key has {} bytes, expected 32",
                key.len()
            )));
        }
        let race_id = Uuid::from_slice(&key[..16])
            .map_err(|e| Error::Storage(format!("Bad race id in score key: {}", e)))?;
        let roster_id = Uuid::from_slice(&key[16..])
            .map_err(|e| Error::Storage(format!("Bad roster id in score key: {}", e)))?;
        Ok((race_id, roster_id))
    }

    fn decode_points(value: &[u8]) -> Result<i64> {
        let bytes: [u8; 8] = value
            .try_into()
            .map_err(|_| Error::Storage(format!("Score value has {} bytes", value.len())))?;
        Ok(i64::from_be_bytes(bytes))
    }

    // Catalog operations

    /// Replace the whole driver and constructor catalog (atomic)
    pub fn replace_catalog(&self, drivers: &[Driver], constructors: &[Constructor]) -> Result<()> {
        let cf_drivers = self.cf_handle(CF_DRIVERS)?;
        let cf_constructors = self.cf_handle(CF_CONSTRUCTORS)?;
        let mut batch = WriteBatch::default();

        {
            let view = self.view();
            for key in view.keys(CF_DRIVERS)? {
                batch.delete_cf(cf_drivers, key);
            }
            for key in view.keys(CF_CONSTRUCTORS)? {
                batch.delete_cf(cf_constructors, key);
            }
        }

        for driver in drivers {
            batch.put_cf(cf_drivers, driver.id.as_str(), bincode::serialize(driver)?);
        }
        for constructor in constructors {
            batch.put_cf(
                cf_constructors,
                constructor.id.as_str(),
                bincode::serialize(constructor)?,
            );
        }

        self.write(batch)?;

        tracing::info!(
            drivers = drivers.len(),
            constructors = constructors.len(),
            "Catalog replaced"
        );

        Ok(())
    }

    // Roster operations

    /// Put roster
    pub fn put_roster(&self, roster: &Roster) -> Result<()> {
        let cf = self.cf_handle(CF_ROSTERS)?;
        self.db
            .put_cf(cf, roster.id.as_bytes(), bincode::serialize(roster)?)?;
        Ok(())
    }

    /// Delete roster together with all of its score rows (atomic)
    ///
    /// Returns the number of score rows removed.
    pub fn delete_roster(&self, roster_id: Uuid) -> Result<usize> {
        let cf_rosters = self.cf_handle(CF_ROSTERS)?;
        let cf_scores = self.cf_handle(CF_SCORES)?;
        let mut batch = WriteBatch::default();

        let rows = {
            let view = self.view();
            view.roster(roster_id)?;
            view.scores()?
                .into_iter()
                .filter(|row| row.roster_id == roster_id)
                .collect::<Vec<_>>()
        };

        batch.delete_cf(cf_rosters, roster_id.as_bytes());
        for row in &rows {
            batch.delete_cf(cf_scores, Self::score_key(row.race_id, roster_id));
        }

        self.write(batch)?;
        Ok(rows.len())
    }

    // Settings

    /// Persist a boolean setting
    pub fn put_flag(&self, key: &str, value: bool) -> Result<()> {
        let cf = self.cf_handle(CF_SETTINGS)?;
        self.db.put_cf(cf, key, [value as u8])?;
        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let view = self.view();
        Ok(StorageStats {
            total_races: view.keys(CF_RACES)?.len() as u64,
            total_rosters: view.keys(CF_ROSTERS)?.len() as u64,
            total_score_rows: view.keys(CF_SCORES)?.len() as u64,
            total_drivers: view.keys(CF_DRIVERS)?.len() as u64,
        })
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle(cf_name)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }
}

/// Snapshot-backed read view over [`Storage`]
pub struct StorageView<'a> {
    storage: &'a Storage,
    snapshot: Snapshot<'a>,
}

impl<'a> StorageView<'a> {
    fn scan<T>(
        &self,
        cf_name: &str,
        mut decode: impl FnMut(&[u8], &[u8]) -> Result<T>,
    ) -> Result<Vec<T>> {
        let cf = self.storage.cf_handle(cf_name)?;
        let mut items = Vec::new();
        for item in self.snapshot.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            items.push(decode(&key[..], &value[..])?);
        }
        Ok(items)
    }

    fn keys(&self, cf_name: &str) -> Result<Vec<Box<[u8]>>> {
        self.scan(cf_name, |key, _| Ok(key.into()))
    }

    fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.storage.cf_handle(cf_name)?;
        Ok(self.snapshot.get_cf(cf, key)?)
    }

    /// All drivers, ordered by id
    pub fn drivers(&self) -> Result<Vec<Driver>> {
        self.scan(CF_DRIVERS, |_, value| Ok(bincode::deserialize(value)?))
    }

    /// All constructors, ordered by id
    pub fn constructors(&self) -> Result<Vec<Constructor>> {
        self.scan(CF_CONSTRUCTORS, |_, value| Ok(bincode::deserialize(value)?))
    }

    /// Race outcome by ID
    pub fn race(&self, race_id: Uuid) -> Result<RaceOutcome> {
        let value = self
            .get(CF_RACES, race_id.as_bytes())?
            .ok_or(Error::RaceNotFound(race_id))?;
        Ok(serde_json::from_slice(&value)?)
    }

    /// All race outcomes, most recently processed first
    pub fn races(&self) -> Result<Vec<RaceOutcome>> {
        let mut races: Vec<RaceOutcome> =
            self.scan(CF_RACES, |_, value| Ok(serde_json::from_slice(value)?))?;
        races.sort_by(|a, b| b.processed_at.cmp(&a.processed_at).then(b.id.cmp(&a.id)));
        Ok(races)
    }

    /// Roster by ID
    pub fn roster(&self, roster_id: Uuid) -> Result<Roster> {
        let value = self
            .get(CF_ROSTERS, roster_id.as_bytes())?
            .ok_or(Error::RosterNotFound(roster_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// All rosters, in creation order
    pub fn rosters(&self) -> Result<Vec<Roster>> {
        self.scan(CF_ROSTERS, |_, value| Ok(bincode::deserialize(value)?))
    }

    /// Every score row in the ledger
    pub fn scores(&self) -> Result<Vec<RosterRaceScore>> {
        self.scan(CF_SCORES, |key, value| {
            let (race_id, roster_id) = Storage::split_score_key(key)?;
            Ok(RosterRaceScore {
                roster_id,
                race_id,
                points: Storage::decode_points(value)?,
            })
        })
    }

    /// Score rows of one race (prefix scan)
    pub fn race_scores(&self, race_id: Uuid) -> Result<Vec<RosterRaceScore>> {
        let cf = self.storage.cf_handle(CF_SCORES)?;
        let prefix = race_id.as_bytes();

        let mut rows = Vec::new();
        let iter = self
            .snapshot
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let (_, roster_id) = Storage::split_score_key(&key)?;
            rows.push(RosterRaceScore {
                roster_id,
                race_id,
                points: Storage::decode_points(&value)?,
            });
        }

        Ok(rows)
    }

    /// Boolean setting, `None` when never written
    pub fn flag(&self, key: &str) -> Result<Option<bool>> {
        Ok(self
            .get(CF_SETTINGS, key.as_bytes())?
            .map(|value| value.first().copied() == Some(1)))
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Stored race outcomes
    pub total_races: u64,
    /// Stored rosters
    pub total_rosters: u64,
    /// Roster score rows across all races
    pub total_score_rows: u64,
    /// Catalog drivers
    pub total_drivers: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstructorId, RaceResult};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn test_roster() -> Roster {
        Roster {
            id: Uuid::now_v7(),
            owner: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            drivers: Default::default(),
            constructors: Default::default(),
            cumulative_points: 0,
            created_at: Utc::now(),
        }
    }

    fn put_score(storage: &Storage, race_id: Uuid, roster_id: Uuid, points: i64) {
        storage
            .put_raw(
                CF_SCORES,
                &Storage::score_key(race_id, roster_id),
                &points.to_be_bytes(),
            )
            .unwrap();
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        for name in COLUMN_FAMILIES {
            assert!(storage.db.cf_handle(name).is_some());
        }
    }

    #[test]
    fn test_replace_catalog() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let old = Driver {
            id: "ricciardo".into(),
            name: "Daniel Ricciardo".to_string(),
            constructor_id: Some("rb".into()),
            price: Decimal::new(90, 1),
        };
        storage.replace_catalog(&[old], &[]).unwrap();

        let new = Driver {
            id: "lawson".into(),
            name: "Liam Lawson".to_string(),
            constructor_id: Some("rb".into()),
            price: Decimal::new(65, 1),
        };
        let rb = Constructor {
            id: "rb".into(),
            name: "Racing Bulls".to_string(),
            price: Decimal::new(63, 1),
        };
        storage.replace_catalog(&[new.clone()], &[rb]).unwrap();

        let view = storage.view();
        assert_eq!(view.drivers().unwrap(), vec![new]);
        assert_eq!(view.constructors().unwrap()[0].id, ConstructorId::new("rb"));
    }

    #[test]
    fn test_roster_round_trip() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let roster = test_roster();
        storage.put_roster(&roster).unwrap();

        assert_eq!(storage.view().roster(roster.id).unwrap(), roster);
        assert!(storage.view().roster(Uuid::now_v7()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_race_scores_prefix_scan() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let race_a = Uuid::now_v7();
        let race_b = Uuid::now_v7();
        let roster_1 = Uuid::now_v7();
        let roster_2 = Uuid::now_v7();

        put_score(&storage, race_a, roster_1, 24);
        put_score(&storage, race_a, roster_2, -5);
        put_score(&storage, race_b, roster_1, 7);

        let view = storage.view();
        let rows = view.race_scores(race_a).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.race_id == race_a));
        assert_eq!(view.scores().unwrap().len(), 3);
    }

    #[test]
    fn test_snapshot_isolation() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let view = storage.view();
        storage.put_roster(&test_roster()).unwrap();

        assert!(view.rosters().unwrap().is_empty());
        assert_eq!(storage.view().rosters().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_roster_removes_rows() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let keep = test_roster();
        let gone = test_roster();
        storage.put_roster(&keep).unwrap();
        storage.put_roster(&gone).unwrap();

        let race = Uuid::now_v7();
        put_score(&storage, race, keep.id, 10);
        put_score(&storage, race, gone.id, 3);

        assert_eq!(storage.delete_roster(gone.id).unwrap(), 1);

        let view = storage.view();
        assert!(view.roster(gone.id).is_err());
        assert_eq!(view.scores().unwrap().len(), 1);
        assert_eq!(view.scores().unwrap()[0].roster_id, keep.id);
    }

    #[test]
    fn test_races_most_recent_first() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let results = RaceResult {
            pole_driver_id: "norris".into(),
            fastest_lap_driver_id: "norris".into(),
            finishers: vec![],
            dnfs: vec![],
        };
        let older = RaceOutcome {
            id: Uuid::now_v7(),
            name: "Bahrain".to_string(),
            results: results.clone(),
            processed_at: Utc::now() - chrono::Duration::days(7),
        };
        let newer = RaceOutcome {
            id: Uuid::now_v7(),
            name: "Jeddah".to_string(),
            results,
            processed_at: Utc::now(),
        };

        for race in [&newer, &older] {
            storage
                .put_raw(CF_RACES, race.id.as_bytes(), &serde_json::to_vec(race).unwrap())
                .unwrap();
        }

        let names: Vec<_> = storage
            .view()
            .races()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Jeddah", "Bahrain"]);
    }

    #[test]
    fn test_flags() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        assert_eq!(storage.view().flag(SETTING_ROSTERS_LOCKED).unwrap(), None);
        storage.put_flag(SETTING_ROSTERS_LOCKED, true).unwrap();
        assert_eq!(storage.view().flag(SETTING_ROSTERS_LOCKED).unwrap(), Some(true));
        storage.put_flag(SETTING_ROSTERS_LOCKED, false).unwrap();
        assert_eq!(storage.view().flag(SETTING_ROSTERS_LOCKED).unwrap(), Some(false));
    }
}
