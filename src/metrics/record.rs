use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const PAGE_LOAD: &str = "page_load";
pub const RESOURCE_LOAD: &str = "resource_load";
pub const TOTAL_LOAD: &str = "total_load";
pub const AVAILABILITY: &str = "availability";

/// Load times for one page, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub page: String,
    pub page_load: f64,
    pub resource_load: f64,
    /// Always `page_load + resource_load`.
    pub total_load: f64,
    #[serde(default)]
    pub resources: usize,
    #[serde(default)]
    pub failed_resources: usize,
    #[serde(default)]
    pub page_error: bool,
}

impl Metric {
    pub fn new(page: impl Into<String>, page_load: Duration, resource_load: Duration) -> Self {
        let page_load = as_millis(page_load);
        let resource_load = as_millis(resource_load);
        Self {
            page: page.into(),
            page_load,
            resource_load,
            total_load: page_load + resource_load,
            resources: 0,
            failed_resources: 0,
            page_error: false,
        }
    }

    pub fn with_resources(mut self, resources: usize, failed: usize) -> Self {
        self.resources = resources;
        self.failed_resources = failed;
        self
    }

    pub fn with_page_error(mut self, page_error: bool) -> Self {
        self.page_error = page_error;
        self
    }
}

fn as_millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

/// Result of one collection run against a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteReport {
    pub site: String,
    pub host: String,
    pub vendor: String,
    /// 100 when the page listing was retrieved and non-empty, otherwise 0.
    pub availability: u64,
    pub metrics: Vec<Metric>,
    pub collected_at: DateTime<Utc>,
    pub elapsed_ms: f64,
}

impl SiteReport {
    pub fn is_available(&self) -> bool {
        self.availability == 100
    }

    /// Flattens the report into namespaced values for the telemetry host.
    pub fn reported(&self) -> Vec<ReportedMetric> {
        let mut out = Vec::with_capacity(self.metrics.len() * 3 + 1);
        for m in &self.metrics {
            for (name, value) in [
                (PAGE_LOAD, m.page_load),
                (RESOURCE_LOAD, m.resource_load),
                (TOTAL_LOAD, m.total_load),
            ] {
                out.push(ReportedMetric {
                    namespace: namespace(&[self.vendor.as_str(), self.host.as_str(), m.page.as_str(), name]),
                    value,
                    timestamp: self.collected_at,
                });
            }
        }
        out.push(ReportedMetric {
            namespace: namespace(&[self.vendor.as_str(), self.host.as_str(), AVAILABILITY]),
            value: self.availability as f64,
            timestamp: self.collected_at,
        });
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedMetric {
    pub namespace: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

pub fn namespace(parts: &[&str]) -> String {
    let mut ns = String::new();
    for part in parts {
        ns.push('/');
        ns.push_str(part);
    }
    ns
}

/// Namespace templates for everything a probe can report, with `*` standing
/// in for the site host and page slug.
pub fn metric_types(vendor: &str) -> Vec<String> {
    let mut types: Vec<String> = [PAGE_LOAD, RESOURCE_LOAD, TOTAL_LOAD]
        .into_iter()
        .map(|name| namespace(&[vendor, "*", "*", name]))
        .collect();
    types.push(namespace(&[vendor, "*", AVAILABILITY]));
    types
}
