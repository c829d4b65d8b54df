//! Running statistics about collection cycles, rendered by `/health`.

use chrono::{DateTime, Utc};
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Clone, Copy, Default)]
struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

#[derive(Default)]
struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// (current, average, max, min)
    fn snapshot(&self) -> (f64, f64, f64, f64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min)
        } else {
            (0.0, 0.0, 0.0, 0.0)
        }
    }
}

/// Statistics shared by all scrapes. Only touched after a cycle finished,
/// never read by the collection itself.
pub struct HealthStats {
    started: Instant,
    pending_packages: Stat,
    collection_duration_seconds: Stat,
    total_collections: AtomicU64,
    failed_collections: AtomicU64,
    last_failed: AtomicBool,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            pending_packages: Stat::default(),
            collection_duration_seconds: Stat::default(),
            total_collections: AtomicU64::new(0),
            failed_collections: AtomicU64::new(0),
            last_failed: AtomicBool::new(false),
            last_success: Mutex::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// `pending` is `None` for a failed cycle.
    pub fn record_collection(&self, pending: Option<u64>, duration_seconds: f64) {
        self.total_collections.fetch_add(1, Ordering::Relaxed);
        self.collection_duration_seconds.add_sample(duration_seconds);
        match pending {
            Some(count) => {
                self.pending_packages.add_sample(count as f64);
                self.last_failed.store(false, Ordering::Relaxed);
                if let Ok(mut last) = self.last_success.lock() {
                    *last = Some(Utc::now());
                }
            }
            None => {
                self.failed_collections.fetch_add(1, Ordering::Relaxed);
                self.last_failed.store(true, Ordering::Relaxed);
            }
        }
    }

    pub fn last_collection_failed(&self) -> bool {
        self.last_failed.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let (pp_cur, pp_avg, pp_max, pp_min) = self.pending_packages.snapshot();
        let (cd_cur, cd_avg, cd_max, cd_min) = self.collection_duration_seconds.snapshot();
        let total = self.total_collections.load(Ordering::Relaxed);
        let failed = self.failed_collections.load(Ordering::Relaxed);
        let last_success = self
            .last_success
            .lock()
            .ok()
            .and_then(|l| *l)
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "pending packages",
            format!("{:.0}", pp_cur),
            format!("{:.1}", pp_avg),
            format!("{:.0}", pp_max),
            format!("{:.0}", pp_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "collection duration (s)",
            format!("{:.3}", cd_cur),
            format!("{:.3}", cd_avg),
            format!("{:.3}", cd_max),
            format!("{:.3}", cd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "number of collections: {}", total).ok();
        writeln!(out, "failed collections: {}", failed).ok();
        writeln!(out, "last successful collection: {}", last_success).ok();
        writeln!(out, "uptime (s): {}", self.uptime_seconds()).ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut stat = RunningStat::default();
        assert_eq!(stat.avg(), 0.0);
        stat.add(4.0);
        stat.add(2.0);
        assert_eq!(stat.min, 2.0);
        assert_eq!(stat.max, 4.0);
        assert_eq!(stat.last, 2.0);
        assert_eq!(stat.avg(), 3.0);
    }

    #[test]
    fn test_failure_then_success() {
        let stats = HealthStats::new();
        assert!(!stats.last_collection_failed());

        stats.record_collection(None, 0.5);
        assert!(stats.last_collection_failed());

        stats.record_collection(Some(12), 1.5);
        assert!(!stats.last_collection_failed());

        let table = stats.render_table();
        assert!(table.contains("number of collections: 2"));
        assert!(table.contains("failed collections: 1"));
        assert!(!table.contains("last successful collection: never"));
    }
}
