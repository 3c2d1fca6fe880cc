//! Thread-safe metrics collection system
//!
//! Atomic counters for screening requests and pipeline stages, plus a bounded
//! window of processing times for latency percentiles.

use crate::screening::pipeline::Stage;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAX_PROCESSING_SAMPLES: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Counters for one pipeline stage
#[derive(Debug, Default)]
struct StageCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    tokens: AtomicU64,
}

impl StageCounters {
    fn snapshot(&self) -> StageMetrics {
        StageMetrics {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            tokens_used: self.tokens.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.tokens.store(0, Ordering::Relaxed);
    }
}

/// Thread-safe metrics collector using atomics and a mutex-guarded sample window
pub struct MetricsCollector {
    screenings_received: AtomicU64,
    screenings_in_flight: AtomicU64,
    max_in_flight: AtomicU64,
    screenings_completed: AtomicU64,
    screenings_failed: AtomicU64,
    screenings_rejected: AtomicU64,

    compliance_stage: StageCounters,
    audit_stage: StageCounters,

    // in milliseconds
    processing_times: Mutex<Vec<u64>>,

    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            screenings_received: AtomicU64::new(0),
            screenings_in_flight: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
            screenings_completed: AtomicU64::new(0),
            screenings_failed: AtomicU64::new(0),
            screenings_rejected: AtomicU64::new(0),
            compliance_stage: StageCounters::default(),
            audit_stage: StageCounters::default(),
            processing_times: Mutex::new(Vec::new()),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    pub fn screening_received(&self) {
        self.screenings_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Request rejected at the schema boundary
    pub fn screening_rejected(&self) {
        self.screenings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn screening_started(&self) {
        let in_flight = self.screenings_in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::Relaxed);
    }

    pub fn screening_completed(&self, duration: Duration) {
        self.screenings_completed.fetch_add(1, Ordering::Relaxed);
        self.finish_in_flight(duration);
    }

    pub fn screening_failed(&self, duration: Duration) {
        self.screenings_failed.fetch_add(1, Ordering::Relaxed);
        self.finish_in_flight(duration);
    }

    pub fn stage_completed(&self, stage: Stage, tokens: u32) {
        let counters = self.stage_counters(stage);
        counters.completed.fetch_add(1, Ordering::Relaxed);
        counters.tokens.fetch_add(u64::from(tokens), Ordering::Relaxed);
    }

    pub fn stage_failed(&self, stage: Stage) {
        self.stage_counters(stage)
            .failed
            .fetch_add(1, Ordering::Relaxed);
    }

    fn stage_counters(&self, stage: Stage) -> &StageCounters {
        match stage {
            Stage::ComplianceScreening => &self.compliance_stage,
            Stage::EthicsAudit => &self.audit_stage,
        }
    }

    fn finish_in_flight(&self, duration: Duration) {
        let _ = self
            .screenings_in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
        self.record_processing_time(duration);
    }

    fn record_processing_time(&self, duration: Duration) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(duration.as_millis() as u64);
            if times.len() > MAX_PROCESSING_SAMPLES {
                times.remove(0);
            }
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.screenings_received,
            &self.screenings_in_flight,
            &self.max_in_flight,
            &self.screenings_completed,
            &self.screenings_failed,
            &self.screenings_rejected,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.compliance_stage.reset();
        self.audit_stage.reset();
        if let Ok(mut times) = self.processing_times.lock() {
            times.clear();
        }
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);
    }

    /// Average, p50, p95, p99 over the sample window
    fn calculate_processing_time_statistics(&self) -> (f64, f64, f64, f64) {
        let Ok(times) = self.processing_times.lock() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut sorted_times = times.clone();
        sorted_times.sort_unstable();

        let avg = sorted_times.iter().sum::<u64>() as f64 / sorted_times.len() as f64;
        (
            avg,
            percentile(&sorted_times, 50.0),
            percentile(&sorted_times, 95.0),
            percentile(&sorted_times, 99.0),
        )
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95, p99) = self.calculate_processing_time_statistics();

        MetricsSnapshot {
            screenings: ScreeningMetrics {
                received: self.screenings_received.load(Ordering::Relaxed),
                in_flight: self.screenings_in_flight.load(Ordering::Relaxed),
                max_in_flight: self.max_in_flight.load(Ordering::Relaxed),
                completed: self.screenings_completed.load(Ordering::Relaxed),
                failed: self.screenings_failed.load(Ordering::Relaxed),
                rejected: self.screenings_rejected.load(Ordering::Relaxed),
                avg_processing_time_ms: avg,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
                processing_time_p99_ms: p99,
            },
            stages: PipelineStageMetrics {
                compliance_screening: self.compliance_stage.snapshot(),
                ethics_audit: self.audit_stage.snapshot(),
            },
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub screenings: ScreeningMetrics,
    pub stages: PipelineStageMetrics,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct ScreeningMetrics {
    pub received: u64,
    pub in_flight: u64,
    pub max_in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub processing_time_p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct PipelineStageMetrics {
    pub compliance_screening: StageMetrics,
    pub ethics_audit: StageMetrics,
}

#[derive(Debug, Serialize)]
pub struct StageMetrics {
    pub completed: u64,
    pub failed: u64,
    pub tokens_used: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;

    lower + (upper - lower) * index.fract()
}
