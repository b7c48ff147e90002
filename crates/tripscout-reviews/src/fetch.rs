//! Concurrent multi-page business search with per-page failure tolerance.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tripscout_core::SearchQuery;

use crate::provider::{with_timeout, BusinessSearchProvider};
use crate::types::RawSearchRecord;

/// Records gathered by [`SearchFetcher::fetch_all`], in page-offset order.
#[derive(Debug, Clone, Default)]
pub struct SearchPages {
    pub records: Vec<RawSearchRecord>,
    /// Pages requested.
    pub attempted: usize,
    /// Pages that contributed nothing because their request failed.
    pub failed: usize,
    /// Display form of the last page error, if any page failed.
    pub last_error: Option<String>,
}

impl SearchPages {
    /// `true` when at least one page was requested and every one failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

pub struct SearchFetcher<S> {
    provider: Arc<S>,
    call_timeout: Duration,
}

impl<S: BusinessSearchProvider> SearchFetcher<S> {
    #[must_use]
    pub fn new(provider: Arc<S>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Requests `pages` pages of `page_size` records concurrently, at offsets
    /// `0, page_size, 2 * page_size, ...`.
    ///
    /// A page that errors or exceeds the call timeout contributes zero
    /// records and is counted in [`SearchPages::failed`]; the rest still
    /// contribute. Records are concatenated in offset order regardless of
    /// which page finished first. Duplicate ids are left in place.
    pub async fn fetch_all(&self, query: &SearchQuery, pages: u32, page_size: u32) -> SearchPages {
        let requests = (0..pages).map(|page| {
            let offset = page.saturating_mul(page_size);
            async move {
                let outcome = with_timeout(
                    self.call_timeout,
                    "business search",
                    self.provider.search(query, page_size, offset),
                )
                .await;
                (offset, outcome)
            }
        });

        let outcomes = join_all(requests).await;

        let mut collected = SearchPages {
            attempted: outcomes.len(),
            ..SearchPages::default()
        };
        for (offset, outcome) in outcomes {
            match outcome {
                Ok(page) => {
                    tracing::debug!(offset, count = page.businesses.len(), "search page fetched");
                    collected.records.extend(page.businesses);
                }
                Err(err) => {
                    tracing::warn!(offset, error = %err, "search page failed; skipping");
                    collected.failed += 1;
                    collected.last_error = Some(err.to_string());
                }
            }
        }

        collected
    }
}
