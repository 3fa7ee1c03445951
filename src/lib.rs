pub mod client;
pub mod config;
pub mod error;
pub mod links;
pub mod metrics;
pub mod output;
pub mod page;
pub mod probe;
pub mod site;

pub use client::FetchClient;
pub use config::{ConfigLoader, ProbeConfig};
pub use error::{Error, Result};
pub use links::extract_links;
pub use metrics::{Metric, ProbeStats, ReportedMetric, SiteReport, StatsSnapshot};
pub use page::{Page, PageTimer};
pub use probe::{MetricSource, SiteProbe};
pub use site::SiteCollector;
