use crate::app_config::{AppConfig, Environment};
use crate::reviews::RankDirection;
use crate::ConfigError;

/// Largest page the business-search provider will serve.
pub const MAX_SEARCH_PAGE_SIZE: u32 = 50;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` instead of `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let yelp_api_key = require("YELP_API_KEY")?;
    let geocode_api_key = require("GEOCODE_API_KEY")?;

    let env = parse_environment(&or_default("TRIPSCOUT_ENV", "development"));

    let bind_addr = or_default("TRIPSCOUT_BIND_ADDR", "0.0.0.0:7890")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TRIPSCOUT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TRIPSCOUT_LOG_LEVEL", "info");

    let yelp_base_url = or_default("TRIPSCOUT_YELP_BASE_URL", "https://api.yelp.com/v3");
    let geocode_base_url = or_default(
        "TRIPSCOUT_GEOCODE_BASE_URL",
        "https://us1.locationiq.com/v1",
    );
    let request_timeout_secs = parse_u64("TRIPSCOUT_REQUEST_TIMEOUT_SECS", "10")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "TRIPSCOUT_REQUEST_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }
    let user_agent = or_default("TRIPSCOUT_USER_AGENT", "tripscout/0.1 (trip-planner)");

    let search_pages = parse_u32("TRIPSCOUT_SEARCH_PAGES", "4")?;
    if search_pages == 0 {
        return Err(invalid("TRIPSCOUT_SEARCH_PAGES", "must be at least 1".to_string()));
    }
    let search_page_size = parse_u32("TRIPSCOUT_SEARCH_PAGE_SIZE", "50")?;
    if search_page_size == 0 || search_page_size > MAX_SEARCH_PAGE_SIZE {
        return Err(invalid(
            "TRIPSCOUT_SEARCH_PAGE_SIZE",
            format!("must be between 1 and {MAX_SEARCH_PAGE_SIZE}"),
        ));
    }
    let result_limit = parse_usize("TRIPSCOUT_RESULT_LIMIT", "3")?;
    if result_limit == 0 {
        return Err(invalid("TRIPSCOUT_RESULT_LIMIT", "must be at least 1".to_string()));
    }
    let rank_direction = or_default("TRIPSCOUT_RANK_DIRECTION", "ascending")
        .parse::<RankDirection>()
        .map_err(|reason| invalid("TRIPSCOUT_RANK_DIRECTION", reason))?;
    let dedup_by_id = parse_bool(&or_default("TRIPSCOUT_DEDUP_BY_ID", "false"))
        .ok_or_else(|| invalid("TRIPSCOUT_DEDUP_BY_ID", "expected true or false".to_string()))?;

    let detail_min_interval_ms = parse_u64("TRIPSCOUT_DETAIL_MIN_INTERVAL_MS", "333")?;
    let max_retries = parse_u32("TRIPSCOUT_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("TRIPSCOUT_RETRY_BACKOFF_BASE_MS", "500")?;
    let api_rate_limit_per_minute = parse_usize("TRIPSCOUT_API_RATE_LIMIT_PER_MINUTE", "120")?;
    if api_rate_limit_per_minute == 0 {
        return Err(invalid(
            "TRIPSCOUT_API_RATE_LIMIT_PER_MINUTE",
            "must be at least 1".to_string(),
        ));
    }
    let api_keys = parse_api_keys(&or_default("TRIPSCOUT_API_KEYS", ""));

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        yelp_api_key,
        geocode_api_key,
        yelp_base_url,
        geocode_base_url,
        request_timeout_secs,
        user_agent,
        search_pages,
        search_page_size,
        result_limit,
        rank_direction,
        dedup_by_id,
        detail_min_interval_ms,
        max_retries,
        retry_backoff_base_ms,
        api_rate_limit_per_minute,
        api_keys,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Comma-separated bearer tokens; blanks are ignored.
fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
