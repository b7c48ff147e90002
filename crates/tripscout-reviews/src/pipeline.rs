//! Review aggregation pipeline orchestration.

use std::sync::Arc;
use std::time::Duration;

use tripscout_core::{AppConfig, EnrichedResult, SearchQuery};

use crate::client::{HttpOptions, YelpClient};
use crate::enrich::DetailEnricher;
use crate::error::PipelineError;
use crate::fetch::SearchFetcher;
use crate::normalize::normalize_all;
use crate::provider::{BusinessDetailProvider, BusinessSearchProvider};
use crate::rank::{RankConfig, Ranker};
use crate::rate_limit::{RateLimiter, RetryPolicy};

/// The production wiring: Yelp serves both search and reviews.
pub type YelpPipeline = AggregationPipeline<YelpClient, YelpClient>;

/// Pipeline stages, entered strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Normalizing,
    Ranking,
    Enriching,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetching"),
            Stage::Normalizing => write!(f, "normalizing"),
            Stage::Ranking => write!(f, "ranking"),
            Stage::Enriching => write!(f, "enriching"),
            Stage::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pages: u32,
    pub page_size: u32,
    pub rank: RankConfig,
    /// Deadline applied to each individual provider call.
    pub call_timeout: Duration,
    /// Retries for review lookups, each attempt taking a limiter slot.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pages: 4,
            page_size: 50,
            rank: RankConfig::default(),
            call_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            pages: config.search_pages,
            page_size: config.search_page_size,
            rank: RankConfig::from_app_config(config),
            call_timeout: Duration::from_secs(config.request_timeout_secs),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
        }
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for zero pages, zero page
    /// size, zero result limit, or a zero call timeout.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.pages == 0 {
            return Err(PipelineError::InvalidConfig("pages must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "page_size must be at least 1".into(),
            ));
        }
        if self.rank.limit == 0 {
            return Err(PipelineError::InvalidConfig(
                "result limit must be at least 1".into(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "call timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Fetch → normalize → rank → enrich, for one query at a time.
///
/// Cheap to share behind an `Arc`; each [`Self::aggregate`] call owns all of
/// its intermediate data. The only state shared across calls is the
/// [`RateLimiter`] handed to the enricher.
pub struct AggregationPipeline<S, D> {
    config: PipelineConfig,
    fetcher: SearchFetcher<S>,
    ranker: Ranker,
    enricher: DetailEnricher<D>,
}

impl<S: BusinessSearchProvider, D: BusinessDetailProvider> AggregationPipeline<S, D> {
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// [`PipelineConfig::validate`].
    pub fn new(
        search: Arc<S>,
        detail: Arc<D>,
        limiter: Arc<RateLimiter>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            fetcher: SearchFetcher::new(search, config.call_timeout),
            ranker: Ranker::new(config.rank),
            enricher: DetailEnricher::new(detail, limiter, config.call_timeout)
                .with_retry(config.retry),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline for `query`.
    ///
    /// 1. Fetch `pages` search pages concurrently; failed pages are skipped.
    /// 2. Normalize records, dropping unusable ones.
    /// 3. Rank by rating and keep the configured top N.
    /// 4. Attach a review to each survivor through the rate limiter.
    ///
    /// An empty result is a success. Per-page and per-item provider failures
    /// are absorbed by the stages themselves.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AllPagesFailed`] if every search page failed,
    /// since an empty list would then misreport a provider outage as "no
    /// businesses found".
    pub async fn aggregate(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<EnrichedResult>, PipelineError> {
        tracing::info!(
            latitude = query.latitude,
            longitude = query.longitude,
            keyword = %query.keyword,
            pages = self.config.pages,
            page_size = self.config.page_size,
            "aggregating reviews"
        );

        enter(Stage::Fetching);
        let pages = self
            .fetcher
            .fetch_all(query, self.config.pages, self.config.page_size)
            .await;
        if pages.all_failed() {
            let last_error = pages
                .last_error
                .unwrap_or_else(|| "unknown provider error".to_owned());
            tracing::error!(
                attempted = pages.attempted,
                error = %last_error,
                "every search page failed"
            );
            return Err(PipelineError::AllPagesFailed {
                attempted: pages.attempted,
                last_error,
            });
        }

        enter(Stage::Normalizing);
        let candidates = normalize_all(&pages.records);

        enter(Stage::Ranking);
        let ranked = self.ranker.rank(candidates);

        enter(Stage::Enriching);
        let results = self.enricher.enrich(ranked).await;

        enter(Stage::Done);
        tracing::info!(
            raw = pages.records.len(),
            failed_pages = pages.failed,
            returned = results.len(),
            with_review = results.iter().filter(|r| r.has_review()).count(),
            "review aggregation complete"
        );
        Ok(results)
    }
}

impl YelpPipeline {
    /// Builds the production pipeline from application config, sharing one
    /// [`YelpClient`] between search and review lookups.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ClientBuild`] if the Yelp client cannot be
    /// constructed, or [`PipelineError::InvalidConfig`] for bad paging or
    /// ranking values.
    pub fn from_app_config(
        config: &AppConfig,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, PipelineError> {
        let options = HttpOptions::from_app_config(config);
        let yelp = Arc::new(YelpClient::with_base_url(
            &config.yelp_api_key,
            &config.yelp_base_url,
            &options,
        )?);
        Self::new(
            Arc::clone(&yelp),
            yelp,
            limiter,
            PipelineConfig::from_app_config(config),
        )
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "pipeline stage");
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use serde_json::json;
    use tripscout_core::RankDirection;

    use super::*;
    use crate::error::ProviderError;
    use crate::types::{ProviderReview, RawSearchRecord, SearchPage};

    /// Returns `first_page` at offset 0 and an empty page elsewhere, or
    /// fails every page when `fail_all` is set.
    struct FakeSearch {
        first_page: Vec<RawSearchRecord>,
        fail_all: bool,
    }

    impl BusinessSearchProvider for FakeSearch {
        fn search(
            &self,
            _query: &SearchQuery,
            _limit: u32,
            offset: u32,
        ) -> impl Future<Output = Result<SearchPage, ProviderError>> + Send {
            let outcome = if self.fail_all {
                Err(ProviderError::UnexpectedStatus {
                    status: 500,
                    url: "fake/search".to_owned(),
                })
            } else if offset == 0 {
                Ok(SearchPage {
                    businesses: self.first_page.clone(),
                    total: None,
                })
            } else {
                Ok(SearchPage::default())
            };
            async move { outcome }
        }
    }

    /// Echoes a review naming the business, except for `failing_id`.
    struct FakeDetail {
        failing_id: Option<&'static str>,
    }

    impl BusinessDetailProvider for FakeDetail {
        fn list_reviews(
            &self,
            business_id: &str,
        ) -> impl Future<Output = Result<Vec<ProviderReview>, ProviderError>> + Send {
            let outcome = if self.failing_id == Some(business_id) {
                Err(ProviderError::NotFound {
                    url: format!("fake/{business_id}/reviews"),
                })
            } else {
                Ok(vec![ProviderReview {
                    text: Some(format!("review of {business_id}")),
                    rating: None,
                }])
            };
            async move { outcome }
        }
    }

    fn five_plus_malformed() -> Vec<RawSearchRecord> {
        [
            json!({ "id": "r3", "name": "Three", "rating": 3 }),
            json!({ "id": "r1a", "name": "One A", "rating": 1 }),
            json!({ "id": "r5", "name": "Five", "rating": 5 }),
            json!({ "id": "r1b", "name": "One B", "rating": 1 }),
            json!({ "id": "r2", "name": "Two", "rating": 2 }),
            json!({ "id": "bad", "name": "Bad", "rating": "n/a" }),
        ]
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect()
    }

    fn pipeline(
        search: FakeSearch,
        detail: FakeDetail,
        config: PipelineConfig,
    ) -> AggregationPipeline<FakeSearch, FakeDetail> {
        AggregationPipeline::new(
            Arc::new(search),
            Arc::new(detail),
            Arc::new(RateLimiter::new(Duration::from_millis(333))),
            config,
        )
        .expect("valid config")
    }

    fn query() -> SearchQuery {
        SearchQuery::new(45.52, -122.68, "thai")
    }

    #[tokio::test(start_paused = true)]
    async fn worst_three_are_ranked_and_enriched_in_order() {
        let p = pipeline(
            FakeSearch {
                first_page: five_plus_malformed(),
                fail_all: false,
            },
            FakeDetail { failing_id: None },
            PipelineConfig::default(),
        );

        let results = p.aggregate(&query()).await.expect("aggregation succeeds");

        let ids: Vec<&str> = results.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["r1a", "r1b", "r2"]);
        let reviews: Vec<&str> = results.iter().map(|r| r.review_text.as_str()).collect();
        assert_eq!(reviews, vec!["review of r1a", "review of r1b", "review of r2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failed_detail_still_yields_three_results() {
        let p = pipeline(
            FakeSearch {
                first_page: five_plus_malformed(),
                fail_all: false,
            },
            FakeDetail {
                failing_id: Some("r1b"),
            },
            PipelineConfig::default(),
        );

        let results = p.aggregate(&query()).await.expect("aggregation succeeds");

        assert_eq!(results.len(), 3);
        assert_eq!(results[1].candidate.id, "r1b");
        assert!(results[1].review_text.is_empty());
        assert!(results[0].has_review() && results[2].has_review());
    }

    #[tokio::test(start_paused = true)]
    async fn descending_direction_returns_best_rated() {
        let config = PipelineConfig {
            rank: RankConfig {
                direction: RankDirection::Descending,
                ..RankConfig::default()
            },
            ..PipelineConfig::default()
        };
        let p = pipeline(
            FakeSearch {
                first_page: five_plus_malformed(),
                fail_all: false,
            },
            FakeDetail { failing_id: None },
            config,
        );

        let results = p.aggregate(&query()).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["r5", "r3", "r2"]);
    }

    #[tokio::test]
    async fn no_candidates_is_an_empty_success() {
        let p = pipeline(
            FakeSearch {
                first_page: Vec::new(),
                fail_all: false,
            },
            FakeDetail { failing_id: None },
            PipelineConfig::default(),
        );
        assert!(p.aggregate(&query()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn total_search_outage_is_a_pipeline_failure() {
        let p = pipeline(
            FakeSearch {
                first_page: Vec::new(),
                fail_all: true,
            },
            FakeDetail { failing_id: None },
            PipelineConfig::default(),
        );

        let err = p.aggregate(&query()).await.unwrap_err();
        match err {
            PipelineError::AllPagesFailed {
                attempted,
                last_error,
            } => {
                assert_eq!(attempted, 4);
                assert!(last_error.contains("500"), "got: {last_error}");
            }
            other => panic!("expected AllPagesFailed, got: {other:?}"),
        }
    }

    #[test]
    fn zero_pages_is_rejected_at_construction() {
        let result = AggregationPipeline::new(
            Arc::new(FakeSearch {
                first_page: Vec::new(),
                fail_all: false,
            }),
            Arc::new(FakeDetail { failing_id: None }),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            PipelineConfig {
                pages: 0,
                ..PipelineConfig::default()
            },
        );
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let config = PipelineConfig {
            rank: RankConfig {
                limit: 0,
                ..RankConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn stage_names_are_lowercase() {
        let names: Vec<String> = [
            Stage::Fetching,
            Stage::Normalizing,
            Stage::Ranking,
            Stage::Enriching,
            Stage::Done,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            names,
            vec!["fetching", "normalizing", "ranking", "enriching", "done"]
        );
    }
}
