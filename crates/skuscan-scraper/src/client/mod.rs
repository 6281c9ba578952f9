//! HTTP client for storefront feeds, JSON endpoints, and product pages.

mod origin;

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::ScraperError;
use crate::types::ProductsPage;

pub use origin::{absolutize_url, extract_store_origin};
#[cfg(test)]
use origin::extract_domain;

const ACCEPT_JSON: &str = "application/json,text/html;q=0.9,*/*;q=0.8";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP client shared by the catalog indexer and every platform resolver.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx responses
/// as typed errors. Requests are never retried: one failure is final for the
/// page or item that issued it.
///
/// With a request delay set, every request waits that long before it is
/// sent. Clones share the underlying connection pool but not a clock, so
/// concurrent callers are paced individually.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    timeout_secs: u64,
    request_delay: Duration,
}

impl StoreClient {
    /// Creates a `StoreClient` with a per-request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
            request_delay: Duration::ZERO,
        })
    }

    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Fetches one page of a site's public `products.json` feed.
    ///
    /// A body without a `products` key deserializes to an empty page.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429.
    /// - [`ScraperError::NotFound`]: HTTP 404.
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ScraperError::Timeout`] / [`ScraperError::Http`]: network or TLS failure.
    /// - [`ScraperError::Deserialize`]: response body is not valid JSON.
    pub async fn fetch_products_page(
        &self,
        origin: &str,
        limit: u32,
        page: u32,
    ) -> Result<ProductsPage, ScraperError> {
        let url = Self::products_url(origin, limit, page)?;
        let body = self.get_text(&url, ACCEPT_JSON).await?;
        serde_json::from_str::<ProductsPage>(&body).map_err(|e| ScraperError::Deserialize {
            context: format!("products page {page} from {origin}"),
            source: e,
        })
    }

    /// Fetches `url` and deserializes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Same status and transport errors as [`Self::fetch_products_page`].
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ScraperError> {
        let body = self.get_text(url, ACCEPT_JSON).await?;
        serde_json::from_str::<T>(&body).map_err(|e| ScraperError::Deserialize {
            context: url.to_owned(),
            source: e,
        })
    }

    /// Fetches the HTML body of a page.
    ///
    /// # Errors
    ///
    /// Same status and transport errors as [`Self::fetch_products_page`].
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        self.get_text(url, ACCEPT_HTML).await
    }

    async fn get_text(&self, url: &str, accept: &str) -> Result<String, ScraperError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(ScraperError::RateLimited {
                domain: origin::extract_domain(url),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        response.text().await.map_err(|e| self.map_transport(e))
    }

    fn map_transport(&self, err: reqwest::Error) -> ScraperError {
        if err.is_timeout() {
            ScraperError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ScraperError::Http(err)
        }
    }

    /// Builds the `products.json` URL for the given site, page size, and
    /// 1-based page number.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the extracted origin cannot
    /// be parsed as a valid URL base.
    fn products_url(origin: &str, limit: u32, page: u32) -> Result<String, ScraperError> {
        let root = extract_store_origin(origin);
        let base = format!("{root}/products.json");
        let mut url = reqwest::Url::parse(&base).map_err(|e| ScraperError::InvalidUrl {
            url: origin.to_owned(),
            reason: format!("origin \"{root}\" is not a valid URL base: {e}"),
        })?;

        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("page", &page.to_string());

        Ok(url.to_string())
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
