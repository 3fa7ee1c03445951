use super::OutputHandler;
use crate::error::Result;
use crate::metrics::record::ReportedMetric;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Buffers reported metrics and writes them as one JSON array on close.
pub struct JsonOutput {
    path: PathBuf,
    records: Vec<ReportedMetric>,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        // Fail on an unwritable path before the run starts, not after it.
        File::create(&path)?;
        Ok(Self {
            path,
            records: Vec::new(),
        })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, record: ReportedMetric) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer.flush()?;
        Ok(())
    }
}
