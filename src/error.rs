use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The page listing endpoint answered with a non-success status.
    #[error("page listing {url} returned {status}")]
    Retrieval {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The page listing body was not the expected JSON array.
    #[error("page listing {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("collection cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Listing-level failures the probe reports as an unavailable site.
    pub fn is_listing_failure(&self) -> bool {
        matches!(
            self,
            Error::Retrieval { .. } | Error::Decode { .. } | Error::Fetch { .. } | Error::InvalidUrl { .. }
        )
    }
}
