use crate::client::FetchClient;
use crate::links::{extract_links_from_html, resolve_links};
use crate::metrics::collector::ProbeStats;
use crate::metrics::record::Metric;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use url::Url;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

/// A page as listed by the WordPress REST API. Only `slug` and `link` drive
/// the timing; everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: u64,
    pub slug: String,
    pub link: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub modified_gmt: Option<String>,
    #[serde(default)]
    pub guid: Rendered,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent: u64,
    #[serde(default)]
    pub author: u64,
    #[serde(default)]
    pub featured_media: u64,
    #[serde(default)]
    pub comment_status: String,
    #[serde(default)]
    pub ping_status: String,
    #[serde(default)]
    pub menu_order: i64,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl Page {
    pub fn new(slug: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: 0,
            slug: slug.into(),
            link: link.into(),
            date: None,
            date_gmt: None,
            modified: None,
            modified_gmt: None,
            guid: Rendered::default(),
            title: Rendered::default(),
            content: Rendered::default(),
            excerpt: Rendered::default(),
            status: String::new(),
            kind: String::new(),
            parent: 0,
            author: 0,
            featured_media: 0,
            comment_status: String::new(),
            ping_status: String::new(),
            menu_order: 0,
            template: String::new(),
            meta: serde_json::Value::Null,
        }
    }
}

pub type Pages = Vec<Page>;

/// Times the download of a page and of every resource it references.
#[derive(Clone)]
pub struct PageTimer {
    client: FetchClient,
    stats: ProbeStats,
    max_concurrent_fetches: usize,
    resolve_relative_links: bool,
}

impl PageTimer {
    pub fn new(client: FetchClient, stats: ProbeStats) -> Self {
        Self {
            client,
            stats,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            resolve_relative_links: false,
        }
    }

    /// Caps simultaneous resource downloads per page. `0` removes the cap.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    pub fn with_relative_link_resolution(mut self, enabled: bool) -> Self {
        self.resolve_relative_links = enabled;
        self
    }

    /// Never fails: a page that cannot be downloaded is timed with an empty
    /// body, and resource failures only count towards elapsed time.
    pub async fn time_page(&self, page: &Page) -> Metric {
        let start = Instant::now();
        let (body, page_error) = match self.client.get_text(&page.link).await {
            Ok(body) => (body, false),
            Err(e) => {
                log::warn!("{}: {}", page.slug, e);
                self.stats.increment_pages_failed();
                (String::new(), true)
            }
        };
        let page_load = start.elapsed();

        let mut links = extract_links_from_html(&body);
        if self.resolve_relative_links {
            match Url::parse(&page.link) {
                Ok(base) => links = resolve_links(&base, links),
                Err(e) => log::debug!("{}: not resolving links against {}: {}", page.slug, page.link, e),
            }
        }
        log::debug!("{}: {} resources", page.slug, links.len());

        let start = Instant::now();
        let failed = self.fetch_all(&links).await;
        let resource_load = start.elapsed();

        self.stats.increment_pages_timed();

        let metric = Metric::new(page.slug.as_str(), page_load, resource_load)
            .with_resources(links.len(), failed)
            .with_page_error(page_error);
        log::info!(
            "{} | Page Load: {:.6} | Resource Load: {:.6} | Total Load: {:.6}",
            metric.page,
            metric.page_load,
            metric.resource_load,
            metric.total_load
        );
        metric
    }

    /// Returns once every fetch has finished, successful or not.
    async fn fetch_all(&self, links: &[String]) -> usize {
        let failed = AtomicUsize::new(0);
        let limit = match self.max_concurrent_fetches {
            0 => None,
            n => Some(n),
        };

        stream::iter(links)
            .for_each_concurrent(limit, |link| {
                let failed = &failed;
                async move {
                    match self.client.fetch(link).await {
                        Ok(bytes) => self.stats.record_resource_success(bytes),
                        Err(e) => {
                            log::debug!("{}", e);
                            self.stats.record_resource_failure();
                            failed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
            .await;

        failed.into_inner()
    }
}
