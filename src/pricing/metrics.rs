// Performance metrics for price calculations
//
// Tracks calculation counts, timing and slow calculations so that rule-set
// growth shows up before it becomes a storefront latency problem.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

/// Default threshold for a slow calculation (rule load + fold)
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct PricingMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    slow_threshold: Duration,
    calculations: AtomicU64,
    rules_applied: AtomicU64,
    total_time_us: AtomicU64,
    slow_calculations: AtomicU64,
}

impl PricingMetrics {
    pub fn new() -> Self {
        Self::with_slow_threshold(Duration::from_millis(DEFAULT_SLOW_THRESHOLD_MS))
    }

    pub fn with_slow_threshold(slow_threshold: Duration) -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                slow_threshold,
                calculations: AtomicU64::new(0),
                rules_applied: AtomicU64::new(0),
                total_time_us: AtomicU64::new(0),
                slow_calculations: AtomicU64::new(0),
            }),
        }
    }

    /// Start timing a calculation; the duration is recorded when the timer drops
    pub fn start_calculation(&self) -> CalculationTimer {
        CalculationTimer {
            start: Instant::now(),
            metrics: self.clone(),
        }
    }

    pub fn record_rules_applied(&self, count: usize) {
        self.inner.rules_applied.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_calculation(&self, duration: Duration) {
        self.inner.calculations.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration > self.inner.slow_threshold {
            self.inner.slow_calculations.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow price calculation: {}ms", duration.as_millis());
        }
    }

    pub fn avg_calculation_time_ms(&self) -> f64 {
        let count = self.inner.calculations.load(Ordering::Relaxed);
        let total_us = self.inner.total_time_us.load(Ordering::Relaxed);

        if count == 0 {
            0.0
        } else {
            (total_us as f64 / count as f64) / 1000.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            calculations: self.inner.calculations.load(Ordering::Relaxed),
            rules_applied: self.inner.rules_applied.load(Ordering::Relaxed),
            avg_calculation_time_ms: self.avg_calculation_time_ms(),
            slow_calculations: self.inner.slow_calculations.load(Ordering::Relaxed),
            slow_threshold_ms: self.inner.slow_threshold.as_millis() as u64,
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        tracing::info!(
            "Pricing metrics: {} calculations, avg {:.2}ms, {} slow, {} rule applications",
            summary.calculations,
            summary.avg_calculation_time_ms,
            summary.slow_calculations,
            summary.rules_applied,
        );
    }
}

impl Default for PricingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records one calculation on drop
pub struct CalculationTimer {
    start: Instant,
    metrics: PricingMetrics,
}

impl Drop for CalculationTimer {
    fn drop(&mut self) {
        self.metrics.record_calculation(self.start.elapsed());
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricsSummary {
    pub calculations: u64,
    pub rules_applied: u64,
    pub avg_calculation_time_ms: f64,
    pub slow_calculations: u64,
    pub slow_threshold_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = PricingMetrics::new();
        let summary = metrics.summary();
        assert_eq!(summary.calculations, 0);
        assert_eq!(summary.avg_calculation_time_ms, 0.0);
        assert_eq!(summary.slow_threshold_ms, DEFAULT_SLOW_THRESHOLD_MS);
    }

    #[test]
    fn test_timer_records_once_on_drop() {
        let metrics = PricingMetrics::new();

        {
            let _timer = metrics.start_calculation();
            thread::sleep(Duration::from_millis(5));
        }

        let summary = metrics.summary();
        assert_eq!(summary.calculations, 1);
        assert!(summary.avg_calculation_time_ms >= 5.0);
    }

    #[test]
    fn test_slow_calculation_detection() {
        let metrics = PricingMetrics::with_slow_threshold(Duration::from_millis(10));

        {
            let _timer = metrics.start_calculation();
            thread::sleep(Duration::from_millis(30));
        }

        assert_eq!(metrics.summary().slow_calculations, 1);
    }

    #[test]
    fn test_rules_applied_accumulates() {
        let metrics = PricingMetrics::new();
        metrics.record_rules_applied(2);
        metrics.record_rules_applied(3);
        assert_eq!(metrics.summary().rules_applied, 5);
    }
}
