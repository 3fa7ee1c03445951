use super::OutputHandler;
use crate::error::Result;
use crate::metrics::record::ReportedMetric;
use async_trait::async_trait;
use std::path::PathBuf;

/// One row per reported metric, with a `namespace,value,timestamp` header.
pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)?;
        Ok(Self { writer })
    }
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn write(&mut self, record: ReportedMetric) -> Result<()> {
        self.writer.serialize(&record)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.csv");
        let mut out = CsvOutput::new(path.clone()).unwrap();
        for ns in ["/a/h/p/page_load", "/a/h/p/total_load"] {
            out.write(ReportedMetric {
                namespace: ns.to_string(),
                value: 2.0,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        }
        out.close().await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "namespace,value,timestamp");
        assert!(lines[1].starts_with("/a/h/p/page_load,2.0,"));
    }
}
