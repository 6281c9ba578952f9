//! Bounded-concurrency batch execution.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use skuscan_core::config::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use skuscan_core::{assemble, Item, ScrapeResult};

use crate::error::ScraperError;
use crate::resolver::{resolve_item, Resolver};

/// Upper bound on one item's resolution, request chain included.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one resolution per item with at most `concurrency` in flight.
///
/// Request pacing lives in [`crate::StoreClient`], so every fetch of a
/// resolution waits, not just its first. A resolution that outlives
/// `item_timeout` becomes that item's error; its siblings keep running.
/// Nothing is retried.
#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency: usize,
    item_timeout: Duration,
}

impl Scheduler {
    /// `concurrency` is clamped to `1..=10`.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY),
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_item_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Resolves every item through `resolve` and returns exactly one result
    /// per item, in input order.
    ///
    /// The returned future is `Send` whenever `Fut` is, so a service host
    /// can `tokio::spawn` a batch.
    pub async fn run_batch<'a, F, Fut>(&self, items: &'a [Item], resolve: F) -> Vec<ScrapeResult>
    where
        F: Fn(&'a Item) -> Fut,
        Fut: Future<Output = ScrapeResult> + 'a,
    {
        let started = Instant::now();
        let item_timeout = self.item_timeout;

        // Built eagerly so no closure is held across `.await`.
        let pending: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let fut = resolve(item);
                async move {
                    let result = if let Ok(result) = tokio::time::timeout(item_timeout, fut).await {
                        result
                    } else {
                        tracing::warn!(
                            sku = item.sku.as_deref().unwrap_or_default(),
                            url = item.url.as_deref().unwrap_or_default(),
                            timeout_ms = item_timeout.as_millis(),
                            "item timed out"
                        );
                        let error = ScraperError::Timeout {
                            secs: item_timeout.as_secs(),
                        };
                        ScrapeResult::failed(item, error.to_string())
                    };
                    (index, result)
                }
            })
            .collect();

        let indexed: Vec<(usize, ScrapeResult)> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let results = assemble(items, indexed);
        let failed = results.iter().filter(|r| r.is_error()).count();
        tracing::info!(
            items = results.len(),
            failed,
            concurrency = self.concurrency,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "batch complete"
        );
        results
    }

    /// [`Self::run_batch`] through a platform resolver, folding resolver
    /// errors into failed results.
    pub async fn run_resolver<R: Resolver>(&self, items: &[Item], resolver: &R) -> Vec<ScrapeResult> {
        self.run_batch(items, |item| resolve_item(resolver, item)).await
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
