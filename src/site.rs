use crate::client::FetchClient;
use crate::error::{Error, Result};
use crate::metrics::collector::ProbeStats;
use crate::metrics::record::Metric;
use crate::page::{PageTimer, Pages};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Page listing route of the WordPress REST API.
pub const PAGES_ENDPOINT: &str = "/wp-json/wp/v2/pages";

/// Lists a site's pages and times all of them in parallel.
#[derive(Clone)]
pub struct SiteCollector {
    client: FetchClient,
    timer: PageTimer,
    stats: ProbeStats,
    max_concurrent_pages: usize,
}

impl SiteCollector {
    pub fn new(client: FetchClient, timer: PageTimer, stats: ProbeStats) -> Self {
        Self {
            client,
            timer,
            stats,
            max_concurrent_pages: 0,
        }
    }

    /// Caps how many pages are timed at once. `0` times every page at once.
    pub fn with_max_concurrent_pages(mut self, limit: usize) -> Self {
        self.max_concurrent_pages = limit;
        self
    }

    pub fn listing_url(site: &str) -> String {
        format!("{}{}", site.trim_end_matches('/'), PAGES_ENDPOINT)
    }

    pub async fn fetch_pages(&self, site: &str) -> Result<Pages> {
        let url = Self::listing_url(site);
        log::info!("Fetching page listing from {}", url);
        let pages: Pages = self.client.get_json(&url).await?;
        log::info!("Found {} pages", pages.len());
        Ok(pages)
    }

    /// Lists and times every page of `site`. Cancelling `cancel` aborts all
    /// in-flight page and resource downloads and yields `Error::Cancelled`.
    pub async fn collect(&self, site: &str, cancel: &CancellationToken) -> Result<Vec<Metric>> {
        let pages = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            pages = self.fetch_pages(site) => pages?,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::warn!("Collection for {} cancelled", site);
                Err(Error::Cancelled)
            }
            metrics = self.time_pages(pages) => metrics,
        }
    }

    /// Produces exactly one metric per page. Workers publish onto a channel
    /// drained by a single aggregator; the set of workers is the barrier.
    pub async fn time_pages(&self, pages: Pages) -> Result<Vec<Metric>> {
        self.stats.add_pages_total(pages.len() as u64);

        let (metrics_tx, metrics_rx) = mpsc::channel(pages.len().max(1));
        let aggregator = tokio::spawn(
            tokio_stream::wrappers::ReceiverStream::new(metrics_rx).collect::<Vec<Metric>>(),
        );

        let permits = match self.max_concurrent_pages {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        // Dropping the set aborts every page task still running.
        let mut workers = JoinSet::new();
        for page in pages {
            let timer = self.timer.clone();
            let stats = self.stats.clone();
            let metrics_tx = metrics_tx.clone();
            let permits = permits.clone();

            workers.spawn(async move {
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let _active = stats.track_active_page();
                let metric = timer.time_page(&page).await;
                let _ = metrics_tx.send(metric).await;
            });
        }
        drop(metrics_tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("Page task failed: {}", e);
            }
        }
        log::debug!("All page timers finished.");

        aggregator
            .await
            .map_err(|e| Error::Internal(format!("Metrics aggregator failed: {}", e)))
    }
}
