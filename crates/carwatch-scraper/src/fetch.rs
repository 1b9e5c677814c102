use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;

use crate::error::ScraperError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// HTTP client for index and listing pages.
///
/// Every request carries the configured `User-Agent` and `Accept-Language`,
/// follows redirects, and is retried according to the [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    user_agent: String,
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Builds a fetcher with the given per-request timeout and identity headers.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying client cannot be built,
    /// or [`ScraperError::InvalidHeader`] if `accept_language` is not a valid header value.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        accept_language: &str,
        policy: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        let language =
            HeaderValue::from_str(accept_language).map_err(|e| ScraperError::InvalidHeader {
                name: "Accept-Language",
                reason: e.to_string(),
            })?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
            policy,
        })
    }

    /// Builds a fetcher from the application config with the default retry policy.
    ///
    /// # Errors
    ///
    /// See [`PageFetcher::new`].
    pub fn from_app_config(config: &carwatch_core::AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            &config.accept_language,
            RetryPolicy::default(),
        )
    }

    /// The shared client, reused by the reveal endpoint.
    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetches `url` and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns the last [`ScraperError::Http`] or [`ScraperError::UnexpectedStatus`]
    /// once the retry budget is spent.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(&self.policy, || async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }
            Ok(response.text().await?)
        })
        .await
    }
}
