pub mod collector;
pub mod record;
pub mod snapshot;

pub use collector::{ActivePage, ProbeStats};
pub use record::{Metric, ReportedMetric, SiteReport};
pub use snapshot::StatsSnapshot;
