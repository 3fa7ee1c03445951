use crate::client::FetchClient;
use crate::config::schema::ProbeConfig;
use crate::error::{Error, Result};
use crate::metrics::collector::ProbeStats;
use crate::metrics::record::{self, SiteReport};
use crate::metrics::snapshot::StatsSnapshot;
use crate::page::PageTimer;
use crate::site::SiteCollector;
use async_trait::async_trait;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;
use validator::Validate;

/// Something a telemetry host can poll for metrics.
#[async_trait]
pub trait MetricSource: Send + Sync {
    fn name(&self) -> String;
    fn metric_types(&self) -> Vec<String>;
    async fn collect_metrics(&self) -> Result<SiteReport>;
}

/// Point-in-time load probe for one WordPress site.
pub struct SiteProbe {
    config: ProbeConfig,
    host: String,
    collector: SiteCollector,
    stats: ProbeStats,
    cancel: CancellationToken,
}

impl SiteProbe {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        let host = site_host(&config.site)?;
        let stats = ProbeStats::new();
        let client = FetchClient::new(config.timeout(), &config.user_agent)?;
        log::debug!("Fetch timeout for {} is {:?}", host, client.timeout());
        let timer = PageTimer::new(client.clone(), stats.clone())
            .with_max_concurrent_fetches(config.max_concurrent_fetches)
            .with_relative_link_resolution(config.resolve_relative_links);
        let collector = SiteCollector::new(client, timer, stats.clone())
            .with_max_concurrent_pages(config.max_concurrent_pages);

        Ok(Self {
            config,
            host,
            collector,
            stats,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Cancelling this token stops any collection started through
    /// `collect_metrics`.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn watch_stats(&self) -> watch::Receiver<StatsSnapshot> {
        let (tx, rx) = watch::channel(self.stats.snapshot());
        let stats = self.stats.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(stats.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// Runs one collection. A site whose page listing cannot be retrieved or
    /// is empty is reported with availability 0 and no page metrics; only
    /// cancellation and internal failures are returned as errors.
    pub async fn collect_with_cancel(&self, cancel: CancellationToken) -> Result<SiteReport> {
        let site = self.config.site.as_str();
        let run = cancel.child_token();
        let start = Instant::now();
        let collected_at = Utc::now();

        let collected = match self.config.deadline() {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.collector.collect(site, &run)).await {
                    Ok(result) => result,
                    Err(_) => {
                        log::warn!("Collection for {} exceeded {:?}", site, deadline);
                        run.cancel();
                        Err(Error::Cancelled)
                    }
                }
            }
            None => self.collector.collect(site, &run).await,
        };

        let metrics = match collected {
            Ok(metrics) => metrics,
            Err(e) if e.is_listing_failure() => {
                log::error!("Error: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let availability = if metrics.is_empty() { 0 } else { 100 };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
        log::info!(
            "{}: {} pages timed, availability {} ({:.1}ms)",
            site,
            metrics.len(),
            availability,
            elapsed_ms
        );

        Ok(SiteReport {
            site: site.to_string(),
            host: self.host.clone(),
            vendor: self.config.vendor.clone(),
            availability,
            metrics,
            collected_at,
            elapsed_ms,
        })
    }
}

#[async_trait]
impl MetricSource for SiteProbe {
    fn name(&self) -> String {
        format!("{}/{}", self.config.vendor, self.host)
    }

    fn metric_types(&self) -> Vec<String> {
        record::metric_types(&self.config.vendor)
    }

    async fn collect_metrics(&self) -> Result<SiteReport> {
        self.collect_with_cancel(self.cancel.clone()).await
    }
}

/// Host segment used in metric namespaces, including a non-default port.
pub fn site_host(site: &str) -> Result<String> {
    let url = Url::parse(site).map_err(|source| Error::InvalidUrl {
        url: site.to_string(),
        source,
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Config(format!("{} has no host", site)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::PAGES_ENDPOINT;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_listing(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(PAGES_ENDPOINT))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn probe(server: &MockServer) -> SiteProbe {
        let mut config = ProbeConfig::for_site(server.uri());
        config.vendor = "acme".to_string();
        SiteProbe::new(config).unwrap()
    }

    #[test]
    fn host_keeps_explicit_port() {
        assert_eq!(site_host("https://example.com/blog").unwrap(), "example.com");
        assert_eq!(site_host("http://127.0.0.1:8080").unwrap(), "127.0.0.1:8080");
        assert!(matches!(site_host("example.com"), Err(Error::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = ProbeConfig::for_site("https://example.com");
        config.timeout_secs = 0;
        assert!(matches!(SiteProbe::new(config), Err(Error::Validation(_))));

        let mut config = ProbeConfig::for_site("https://example.com");
        config.vendor = "a/b".to_string();
        assert!(matches!(SiteProbe::new(config), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn malformed_listing_reports_unavailable_site() {
        let server = MockServer::start().await;
        mount_listing(&server, ResponseTemplate::new(200).set_body_string("<html>not json</html>")).await;

        let report = probe(&server).collect_metrics().await.unwrap();
        assert_eq!(report.availability, 0);
        assert!(report.metrics.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_reports_unavailable_site() {
        let server = MockServer::start().await;
        mount_listing(&server, ResponseTemplate::new(500)).await;

        let report = probe(&server).collect_metrics().await.unwrap();
        assert_eq!(report.availability, 0);
        assert!(report.metrics.is_empty());
        assert_eq!(report.reported().len(), 1);
    }

    #[tokio::test]
    async fn empty_listing_reports_unavailable_site() {
        let server = MockServer::start().await;
        mount_listing(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;

        let report = probe(&server).collect_metrics().await.unwrap();
        assert_eq!(report.availability, 0);
        assert!(report.metrics.is_empty());
    }

    #[tokio::test]
    async fn unreachable_site_reports_unavailable() {
        let config = ProbeConfig::for_site("http://127.0.0.1:1");
        let report = SiteProbe::new(config).unwrap().collect_metrics().await.unwrap();
        assert_eq!(report.availability, 0);
    }

    #[tokio::test]
    async fn available_site_reports_every_page() {
        let server = MockServer::start().await;
        let uri = server.uri();
        mount_listing(
            &server,
            ResponseTemplate::new(200).set_body_json(json!([
                {"slug": "home", "link": format!("{}/home/", uri)},
                {"slug": "contact", "link": format!("{}/contact/", uri)},
            ])),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/home/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let probe = probe(&server);
        let report = probe.collect_metrics().await.unwrap();
        assert_eq!(report.availability, 100);
        assert_eq!(report.metrics.len(), 2);

        let reported = report.reported();
        assert_eq!(reported.len(), 7);
        let availability = format!("/acme/{}/availability", probe.host());
        assert!(reported.iter().any(|r| r.namespace == availability && r.value == 100.0));
        assert_eq!(probe.stats().pages_timed, 2);
    }

    #[tokio::test]
    async fn deadline_cancels_the_run() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let mut config = ProbeConfig::for_site(server.uri());
        config.deadline_secs = Some(1);
        let err = SiteProbe::new(config).unwrap().collect_metrics().await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_token_stops_collection() {
        let server = MockServer::start().await;
        mount_listing(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;

        let probe = probe(&server);
        probe.cancel_token().cancel();
        assert!(matches!(probe.collect_metrics().await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn metric_types_use_configured_vendor() {
        let probe = SiteProbe::new(ProbeConfig::for_site("https://example.com")).unwrap();
        assert!(probe.metric_types().iter().all(|t| t.starts_with("/siteprobe/")));
        assert_eq!(probe.name(), "siteprobe/example.com");
    }
}
