use crate::config::schema::{self, OutputConfig, ProbeConfig};
use crate::error::{Error, Result};
use crate::output::{OutputHandler, console::ConsoleOutput, csv::CsvOutput, json::JsonOutput};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ProbeConfig> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves inheritance without validating, for callers that still apply
    /// overrides (such as command-line flags) and validate afterwards.
    pub fn load_unvalidated<P: AsRef<Path>>(path: P) -> Result<ProbeConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<ProbeConfig> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        if let Some(parent_path_str) = &config.extends {
            let parent_path = path.parent()
                .ok_or_else(|| Error::Config(format!(
                    "Cannot determine parent directory for {}",
                    path.display()
                )))?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited)?;
            Ok(Self::merge_configs(parent_config, config))
        } else {
            Ok(config)
        }
    }

    fn load_file(path: &Path) -> Result<ProbeConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    /// Child values win wherever they differ from the defaults.
    fn merge_configs(mut parent: ProbeConfig, child: ProbeConfig) -> ProbeConfig {
        if !child.site.is_empty() {
            parent.site = child.site;
        }
        if child.vendor != schema::default_vendor() {
            parent.vendor = child.vendor;
        }
        if child.timeout_secs != schema::default_timeout() {
            parent.timeout_secs = child.timeout_secs;
        }
        if child.max_concurrent_fetches != schema::default_max_concurrent_fetches() {
            parent.max_concurrent_fetches = child.max_concurrent_fetches;
        }
        if child.max_concurrent_pages != 0 {
            parent.max_concurrent_pages = child.max_concurrent_pages;
        }
        if child.deadline_secs.is_some() {
            parent.deadline_secs = child.deadline_secs;
        }
        if child.resolve_relative_links {
            parent.resolve_relative_links = true;
        }
        if child.user_agent != schema::default_user_agent() {
            parent.user_agent = child.user_agent;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }

        parent.extends = None;
        parent
    }

    pub fn create_output(
        config: &ProbeConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn OutputHandler>> {
        let handler: Box<dyn OutputHandler> = match &config.output {
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Csv { path }) => Box::new(CsvOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Console) | None => Box::new(ConsoleOutput::new(multi)),
        };
        Ok(handler)
    }
}
