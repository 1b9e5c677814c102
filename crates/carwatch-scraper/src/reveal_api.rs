//! Phone lookup through the site's reveal endpoint.

use std::time::Duration;

use reqwest::header::{ACCEPT, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::error::ScraperError;
use crate::phone::normalize_endpoint_phone;
use crate::resolve::RevealToken;

const REVEAL_TIMEOUT: Duration = Duration::from_secs(20);
const PHONE_FIELDS: &[&str] = &["formattedPhoneNumber", "phoneNumber", "phone"];

/// Listing id plus the token that authorizes revealing its phone.
#[derive(Debug, PartialEq, Eq)]
pub struct PhoneRequest {
    pub auto_id: i64,
    pub token: RevealToken,
}

/// Calls `GET {origin}/users/phones/{auto_id}?expires=..&hash=..`.
#[derive(Debug, Clone)]
pub struct RevealEndpoint {
    client: Client,
    origin: Url,
    user_agent: String,
}

impl RevealEndpoint {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(client: Client, base_url: &str, user_agent: &str) -> Result<Self, ScraperError> {
        let origin = Url::parse(base_url).map_err(|e| ScraperError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            origin,
            user_agent: user_agent.to_owned(),
        })
    }

    fn endpoint_url(&self, request: &PhoneRequest) -> Result<Url, ScraperError> {
        let mut url = self
            .origin
            .join(&format!("/users/phones/{}", request.auto_id))
            .map_err(|e| ScraperError::InvalidUrl {
                url: self.origin.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("expires", request.token.expires())
            .append_pair("hash", request.token.hash());
        Ok(url)
    }

    /// Spends the token and returns the normalized phone, if any.
    ///
    /// Non-200 responses, undecodable bodies and bodies without a usable
    /// phone field all yield `None`. Transport failures are logged and also
    /// yield `None`.
    pub async fn reveal(&self, listing_url: &str, request: PhoneRequest) -> Option<i64> {
        let endpoint = match self.endpoint_url(&request) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(listing_url, error = %e, "could not build reveal endpoint URL");
                return None;
            }
        };

        let response = match self
            .client
            .get(endpoint)
            .timeout(REVEAL_TIMEOUT)
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, listing_url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(listing_url, auto_id = request.auto_id, error = %e, "reveal endpoint request failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(
                listing_url,
                status = response.status().as_u16(),
                "reveal endpoint returned non-200"
            );
            return None;
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(listing_url, error = %e, "reveal endpoint body is not JSON");
                return None;
            }
        };

        phone_from_body(&body)
    }
}

/// First non-empty phone field of a reveal response, normalized.
fn phone_from_body(body: &Value) -> Option<i64> {
    let raw = PHONE_FIELDS.iter().find_map(|field| match body.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })?;
    normalize_endpoint_phone(&raw)
}
