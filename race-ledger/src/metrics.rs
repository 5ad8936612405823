//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring race processing.
//!
//! # Metrics
//!
//! - `race_ledger_races_processed_total` - Committed processing runs
//! - `race_ledger_race_aborts_total` - Aborted processing runs
//! - `race_ledger_score_rows_written_total` - Roster score rows written
//! - `race_ledger_process_duration_seconds` - Histogram of processing latencies
//! - `race_ledger_rosters` - Rosters currently stored

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed processing runs
    pub races_processed: IntCounter,

    /// Aborted processing runs
    pub race_aborts: IntCounter,

    /// Score rows written
    pub score_rows_written: IntCounter,

    /// Processing duration histogram
    pub process_duration: Histogram,

    /// Rosters currently stored
    pub rosters: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let races_processed = IntCounter::new(
            "race_ledger_races_processed_total",
            "Committed race processing runs",
        )?;
        registry.register(Box::new(races_processed.clone()))?;

        let race_aborts = IntCounter::new(
            "race_ledger_race_aborts_total",
            "Aborted race processing runs",
        )?;
        registry.register(Box::new(race_aborts.clone()))?;

        let score_rows_written = IntCounter::new(
            "race_ledger_score_rows_written_total",
            "Roster score rows written",
        )?;
        registry.register(Box::new(score_rows_written.clone()))?;

        let process_duration = Histogram::with_opts(
            HistogramOpts::new(
                "race_ledger_process_duration_seconds",
                "Histogram of race processing latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(process_duration.clone()))?;

        let rosters = IntGauge::new("race_ledger_rosters", "Rosters currently stored")?;
        registry.register(Box::new(rosters.clone()))?;

        Ok(Self {
            races_processed,
            race_aborts,
            score_rows_written,
            process_duration,
            rosters,
            registry,
        })
    }

    /// Record a committed processing run
    pub fn record_race_processed(&self, rows_written: usize, duration_seconds: f64) {
        self.races_processed.inc();
        self.score_rows_written.inc_by(rows_written as u64);
        self.process_duration.observe(duration_seconds);
    }

    /// Record an aborted processing run
    pub fn record_race_aborted(&self) {
        self.race_aborts.inc();
    }

    /// Update roster count
    pub fn set_rosters(&self, count: usize) {
        self.rosters.set(count as i64);
    }

    /// Text exposition of every metric
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.races_processed.get(), 0);
        assert_eq!(metrics.race_aborts.get(), 0);

        // Independent registries
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_race_processed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_race_processed(12, 0.004);
        metrics.record_race_processed(12, 0.006);

        assert_eq!(metrics.races_processed.get(), 2);
        assert_eq!(metrics.score_rows_written.get(), 24);
        assert_eq!(metrics.process_duration.get_sample_count(), 2);
    }

    #[test]
    fn test_record_race_aborted() {
        let metrics = Metrics::new().unwrap();
        metrics.record_race_aborted();
        assert_eq!(metrics.race_aborts.get(), 1);
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new().unwrap();
        metrics.set_rosters(3);
        let text = metrics.render().unwrap();
        assert!(text.contains("race_ledger_rosters 3"));
    }
}
