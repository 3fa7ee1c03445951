use crate::metrics::snapshot::StatsSnapshot;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

/// Live counters for a probe run, shared by every page and resource task.
#[derive(Clone)]
pub struct ProbeStats {
    pages_total: Arc<AtomicU64>,
    pages_timed: Arc<AtomicU64>,
    pages_failed: Arc<AtomicU64>,
    active_pages: Arc<AtomicU64>,
    resources_fetched: Arc<AtomicU64>,
    resources_failed: Arc<AtomicU64>,
    bytes_downloaded: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for ProbeStats {
    fn default() -> Self {
        Self {
            pages_total: Arc::new(AtomicU64::new(0)),
            pages_timed: Arc::new(AtomicU64::new(0)),
            pages_failed: Arc::new(AtomicU64::new(0)),
            active_pages: Arc::new(AtomicU64::new(0)),
            resources_fetched: Arc::new(AtomicU64::new(0)),
            resources_failed: Arc::new(AtomicU64::new(0)),
            bytes_downloaded: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pages_total(&self, count: u64) {
        self.pages_total.fetch_add(count, Ordering::SeqCst);
    }

    pub fn increment_pages_timed(&self) {
        self.pages_timed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_pages_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_active_pages(&self) {
        self.active_pages.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement_active_pages(&self) {
        self.active_pages.fetch_sub(1, Ordering::SeqCst);
    }

    /// Counts a page as active until the returned guard is dropped, including
    /// when its task is aborted.
    pub fn track_active_page(&self) -> ActivePage {
        self.increment_active_pages();
        ActivePage {
            stats: self.clone(),
        }
    }

    pub fn record_resource_success(&self, bytes: u64) {
        self.resources_fetched.fetch_add(1, Ordering::SeqCst);
        self.bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub fn record_resource_failure(&self) {
        self.resources_fetched.fetch_add(1, Ordering::SeqCst);
        self.resources_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let fetched = self.resources_fetched.load(Ordering::SeqCst);
        let failed = self.resources_failed.load(Ordering::SeqCst);

        let resource_success_rate = if fetched > 0 {
            ((fetched - failed) as f64 / fetched as f64) * 100.0
        } else {
            0.0
        };

        StatsSnapshot {
            pages_total: self.pages_total.load(Ordering::SeqCst),
            pages_timed: self.pages_timed.load(Ordering::SeqCst),
            pages_failed: self.pages_failed.load(Ordering::SeqCst),
            active_pages: self.active_pages.load(Ordering::SeqCst),
            resources_fetched: fetched,
            resources_failed: failed,
            bytes_downloaded: self.bytes_downloaded.load(Ordering::SeqCst),
            resource_success_rate,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

pub struct ActivePage {
    stats: ProbeStats,
}

impl Drop for ActivePage {
    fn drop(&mut self) {
        self.stats.decrement_active_pages();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = ProbeStats::new();
        stats.add_pages_total(2);
        stats.increment_active_pages();
        stats.record_resource_success(100);
        stats.record_resource_success(50);
        stats.record_resource_failure();
        stats.record_resource_failure();
        stats.increment_pages_timed();
        stats.decrement_active_pages();

        let snap = stats.snapshot();
        assert_eq!(snap.pages_total, 2);
        assert_eq!(snap.pages_timed, 1);
        assert_eq!(snap.active_pages, 0);
        assert_eq!(snap.resources_fetched, 4);
        assert_eq!(snap.resources_failed, 2);
        assert_eq!(snap.bytes_downloaded, 150);
        assert!((snap.resource_success_rate - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn aborted_page_is_no_longer_active() {
        let stats = ProbeStats::new();
        let tracked = stats.clone();
        let task = tokio::spawn(async move {
            let _active = tracked.track_active_page();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(stats.snapshot().active_pages, 1);

        task.abort();
        let _ = task.await;
        assert_eq!(stats.snapshot().active_pages, 0);
    }

    #[test]
    fn clones_share_counters() {
        let stats = ProbeStats::new();
        let other = stats.clone();
        other.increment_pages_failed();
        assert_eq!(stats.snapshot().pages_failed, 1);
    }
}
