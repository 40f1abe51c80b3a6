//! Review feed client.
//!
//! The overlay only ever needs one call, a GET of the review endpoint, so the
//! abstraction is a single-method trait. Tests swap in a canned source.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use crate::error::FetchError;
use crate::model::{HighlightCollection, ReviewPayload};

const JSON_MIME: &str = "application/json";

/// Something that can produce the current review collection.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_highlights(&self, api_key: &str) -> Result<HighlightCollection, FetchError>;
}

/// Production source backed by `reqwest`.
pub struct HttpReviewSource {
    client: reqwest::Client,
    endpoint_url: String,
}

impl HttpReviewSource {
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn fetch_highlights(&self, api_key: &str) -> Result<HighlightCollection, FetchError> {
        tracing::debug!(url = %self.endpoint_url, "requesting review highlights");
        let response = self
            .client
            .get(&self.endpoint_url)
            .header(AUTHORIZATION, format!("Token {api_key}"))
            .header(ACCEPT, JSON_MIME)
            .header(CONTENT_TYPE, JSON_MIME)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        decode_response(status, content_type.as_deref(), &body)
    }
}

/// Validates a raw review response and parses its highlights.
///
/// Status is checked before content type. An empty list is returned as-is;
/// deciding what an empty feed means is up to the caller.
pub fn decode_response(
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<HighlightCollection, FetchError> {
    if !(200..300).contains(&status) {
        return Err(FetchError::UnexpectedStatus(status));
    }

    let content_type = content_type.unwrap_or_default();
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if !mime.eq_ignore_ascii_case(JSON_MIME) {
        let shown = if content_type.is_empty() { "none" } else { content_type };
        return Err(FetchError::UnexpectedContentType(shown.to_string()));
    }

    let payload: ReviewPayload = serde_json::from_slice(body)?;
    Ok(payload.into())
}
