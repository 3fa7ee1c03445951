use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub pages_total: u64,
    pub pages_timed: u64,
    pub pages_failed: u64,
    pub active_pages: u64,
    pub resources_fetched: u64,
    pub resources_failed: u64,
    pub bytes_downloaded: u64,
    pub resource_success_rate: f64,
    pub elapsed_seconds: f64,
}
