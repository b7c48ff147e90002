//! Rate-limited review lookups for ranked candidates.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tripscout_core::{Candidate, EnrichedResult};

use crate::provider::{with_timeout, BusinessDetailProvider};
use crate::rate_limit::{retry_with_backoff, RateLimiter, RetryPolicy};
use crate::types::ProviderReview;

/// Review text attached when a business has no reviews or the lookup failed.
pub const MISSING_REVIEW_TEXT: &str = "";

pub struct DetailEnricher<D> {
    provider: Arc<D>,
    limiter: Arc<RateLimiter>,
    call_timeout: Duration,
    retry: RetryPolicy,
}

impl<D: BusinessDetailProvider> DetailEnricher<D> {
    #[must_use]
    pub fn new(provider: Arc<D>, limiter: Arc<RateLimiter>, call_timeout: Duration) -> Self {
        Self {
            provider,
            limiter,
            call_timeout,
            retry: RetryPolicy::none(),
        }
    }

    /// Retries transient lookup failures under `retry`. Every attempt takes
    /// its own limiter slot.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attaches one review text to every candidate.
    ///
    /// All lookups are queued on the shared [`RateLimiter`] at once and
    /// awaited together. A retry re-enters the limiter queue after its
    /// backoff, and the call timeout applies to each attempt. Output has the
    /// same length and order as the input; a failed, timed-out, or empty
    /// lookup yields [`MISSING_REVIEW_TEXT`] instead of dropping the candidate.
    pub async fn enrich(&self, candidates: Vec<Candidate>) -> Vec<EnrichedResult> {
        let lookups = candidates.iter().map(|candidate| {
            let business_id = candidate.id.as_str();
            retry_with_backoff(self.retry.max_retries, self.retry.backoff_base_ms, move || {
                self.limiter.schedule(move || {
                    with_timeout(
                        self.call_timeout,
                        "review lookup",
                        self.provider.list_reviews(business_id),
                    )
                })
            })
        });

        let outcomes = join_all(lookups).await;

        candidates
            .into_iter()
            .zip(outcomes)
            .map(|(candidate, outcome)| {
                let review_text = match outcome {
                    Ok(reviews) => first_review_text(&reviews).unwrap_or_else(|| {
                        tracing::warn!(business_id = %candidate.id, "provider returned no reviews");
                        MISSING_REVIEW_TEXT.to_owned()
                    }),
                    Err(err) => {
                        tracing::warn!(
                            business_id = %candidate.id,
                            error = %err,
                            "review lookup failed; attaching empty review"
                        );
                        MISSING_REVIEW_TEXT.to_owned()
                    }
                };
                EnrichedResult {
                    candidate,
                    review_text,
                }
            })
            .collect()
    }
}

/// First review, in provider order, whose text is not blank.
fn first_review_text(reviews: &[ProviderReview]) -> Option<String> {
    reviews
        .iter()
        .filter_map(|r| r.text.as_deref())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}
