//! Normalization from raw provider records to [`tripscout_core::Candidate`].
//!
//! Shape detection lives here and nowhere else: nested `location.*` fields
//! win over the flat `city` / `address` fields some payloads carry. Records
//! without a usable id, name, or finite rating are dropped.

use serde_json::Value;
use tripscout_core::Candidate;

use crate::types::{RawLocation, RawSearchRecord};

/// Normalizes one raw record, or returns `None` if it cannot be used.
///
/// Pure: the same record always yields the same result.
#[must_use]
pub fn normalize_record(record: &RawSearchRecord) -> Option<Candidate> {
    let id = record.id.as_ref().and_then(parse_id)?;
    let business_name = non_blank(record.name.as_deref())?;
    let rating = record.rating.as_ref().and_then(parse_rating)?;

    let location = record.location.as_ref();
    let city = location
        .and_then(|l| non_blank(l.city.as_deref()))
        .or_else(|| non_blank(record.city.as_deref()));
    let address = location
        .and_then(nested_address)
        .or_else(|| non_blank(record.address.as_deref()));

    let business_type = record
        .categories
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find_map(|c| non_blank(c.title.as_deref()));

    Some(Candidate {
        id,
        city,
        business_name,
        business_type,
        address,
        rating,
        image_url: non_blank(record.image_url.as_deref()),
    })
}

/// Normalizes a batch, preserving input order and dropping unusable records.
#[must_use]
pub fn normalize_all(records: &[RawSearchRecord]) -> Vec<Candidate> {
    let candidates: Vec<Candidate> = records.iter().filter_map(normalize_record).collect();
    let dropped = records.len() - candidates.len();
    if dropped > 0 {
        tracing::debug!(
            dropped,
            kept = candidates.len(),
            "dropped search records without a usable id, name, or rating"
        );
    }
    candidates
}

fn nested_address(location: &RawLocation) -> Option<String> {
    non_blank(location.address1.as_deref()).or_else(|| {
        location
            .display_address
            .as_deref()
            .and_then(|lines| lines.first())
            .and_then(|line| non_blank(Some(line.as_str())))
    })
}

/// Accepts string ids and, for older payloads, integer ids.
fn parse_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s.as_str())),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings; rejects anything non-finite.
fn parse_rating(value: &Value) -> Option<f64> {
    let rating = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    rating.is_finite().then_some(rating)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
