pub mod client;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod rank;
pub mod rate_limit;
pub mod types;

pub use client::{GeocodeClient, HttpOptions, YelpClient};
pub use enrich::DetailEnricher;
pub use error::{PipelineError, ProviderError};
pub use fetch::{SearchFetcher, SearchPages};
pub use normalize::{normalize_all, normalize_record};
pub use pipeline::{AggregationPipeline, PipelineConfig, Stage, YelpPipeline};
pub use provider::{BusinessDetailProvider, BusinessSearchProvider};
pub use rank::{RankConfig, Ranker};
pub use rate_limit::{RateLimiter, RetryPolicy};
pub use types::{GeoPoint, GeocodePlace, ProviderReview, RawSearchRecord, SearchPage};
