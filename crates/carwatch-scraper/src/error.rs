use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {name} header value: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    #[error("invalid {name} pattern: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("browser {stage} failed: {reason}")]
    Browser { stage: &'static str, reason: String },

    #[error("failed to persist {url}: {source}")]
    Persist {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
