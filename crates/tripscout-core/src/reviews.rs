//! Domain types shared by the review-aggregation pipeline and its callers.

use serde::{Deserialize, Serialize};

/// Coordinates plus a free-text keyword, built once per aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub keyword: String,
}

impl SearchQuery {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, keyword: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            keyword: keyword.into(),
        }
    }
}

/// A business record normalized out of whatever shape the search provider
/// returned. `rating` is always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub city: Option<String>,
    pub business_name: String,
    pub business_type: Option<String>,
    pub address: Option<String>,
    pub rating: f64,
    pub image_url: Option<String>,
}

/// A ranked candidate with one representative review attached.
///
/// `review_text` is empty when the provider had no reviews for the business
/// or the lookup failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub review_text: String,
}

impl EnrichedResult {
    #[must_use]
    pub fn has_review(&self) -> bool {
        !self.review_text.is_empty()
    }
}

/// Sort direction applied to candidate ratings before truncation.
///
/// `Ascending` puts the lowest-rated businesses first, which is what the
/// "find the worst reviewed place" feature relies on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDirection {
    #[default]
    Ascending,
    Descending,
}

impl std::fmt::Display for RankDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankDirection::Ascending => write!(f, "ascending"),
            RankDirection::Descending => write!(f, "descending"),
        }
    }
}

impl std::str::FromStr for RankDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(RankDirection::Ascending),
            "descending" | "desc" => Ok(RankDirection::Descending),
            other => Err(format!(
                "unknown rank direction '{other}' (expected ascending or descending)"
            )),
        }
    }
}
