use crate::error::{Error, Result};
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared transport for every outbound request the probe makes.
///
/// Certificate checks are off so self-signed or misconfigured sites can still
/// be timed, and response compression is off so timings reflect the bytes as
/// served.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    timeout: Duration,
}

impl FetchClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Internal(format!("Building HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Downloads a page body. Any status is accepted; only transport errors fail.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let res = self.client.get(url).send().await.map_err(|e| fetch_error(url, e))?;
        let status = res.status();
        if !status.is_success() {
            log::debug!("{} answered {}", url, status);
        }
        res.text().await.map_err(|e| fetch_error(url, e))
    }

    /// Downloads a resource to completion and returns the number of bytes read.
    pub async fn fetch(&self, url: &str) -> Result<u64> {
        let res = self.client.get(url).send().await.map_err(|e| fetch_error(url, e))?;
        let body = res.bytes().await.map_err(|e| fetch_error(url, e))?;
        Ok(body.len() as u64)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let res = self.client.get(url).send().await.map_err(|e| fetch_error(url, e))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Retrieval {
                url: url.to_string(),
                status,
            });
        }

        let body = res.bytes().await.map_err(|e| fetch_error(url, e))?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn fetch_error(url: &str, source: reqwest::Error) -> Error {
    Error::Fetch {
        url: url.to_string(),
        source,
    }
}
