use crate::metrics::{MeasurementListener, SmoothedMetrics};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Listener that reports smoothed metrics through the log.
pub struct MetricsDisplay {
    json: bool,
    report_every: u64,
    updates: AtomicU64,
    latest: Mutex<Option<SmoothedMetrics>>,
}

impl MetricsDisplay {
    /// Logs one update out of every `report_every`; zero is treated as one.
    pub fn new(json: bool, report_every: u64) -> Self {
        Self {
            json,
            report_every: report_every.max(1),
            updates: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    pub fn latest(&self) -> Option<SmoothedMetrics> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn render(&self, metrics: &SmoothedMetrics) -> String {
        if !self.json {
            return metrics.to_string();
        }
        match serde_json::to_string(metrics) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize metrics: {}", e);
                metrics.to_string()
            }
        }
    }
}

impl MeasurementListener for MetricsDisplay {
    fn on_measurement_update(&self, metrics: &SmoothedMetrics) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(*metrics);
        let count = self.updates.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.report_every == 0 {
            info!("{}", self.render(metrics));
        }
    }
}
