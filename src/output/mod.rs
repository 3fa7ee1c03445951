use crate::error::Result;
use crate::metrics::record::{ReportedMetric, SiteReport};
use async_trait::async_trait;

pub mod console;
pub mod csv;
pub mod json;

#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, record: ReportedMetric) -> Result<()>;

    async fn write_report(&mut self, report: &SiteReport) -> Result<()> {
        for record in report.reported() {
            self.write(record).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
