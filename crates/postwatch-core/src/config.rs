use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound the platform accepts for `max_results` on the timeline endpoint.
const MAX_FETCH_RESULTS: u32 = 100;

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
/// Decoupled from the real environment so it can be tested with a `HashMap`
/// lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let platform_bearer_token = require("POSTWATCH_PLATFORM_BEARER_TOKEN")?;

    let env = parse_environment(&or_default("POSTWATCH_ENV", "development"))?;
    let log_level = or_default("POSTWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("POSTWATCH_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("POSTWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("POSTWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let platform_api_base_url = or_default(
        "POSTWATCH_PLATFORM_API_BASE_URL",
        "https://api.twitter.com",
    );
    let request_timeout_secs = parse_u64("POSTWATCH_REQUEST_TIMEOUT_SECS", "30")?;
    let preview_user_agent = or_default(
        "POSTWATCH_PREVIEW_USER_AGENT",
        "postwatch/0.1 (link-preview)",
    );

    let fetch_max_results = parse_u32("POSTWATCH_FETCH_MAX_RESULTS", "10")?;
    if fetch_max_results == 0 || fetch_max_results > MAX_FETCH_RESULTS {
        return Err(ConfigError::InvalidEnvVar {
            var: "POSTWATCH_FETCH_MAX_RESULTS".to_string(),
            reason: format!("must be between 1 and {MAX_FETCH_RESULTS}, got {fetch_max_results}"),
        });
    }
    let fetch_max_retries = parse_u32("POSTWATCH_FETCH_MAX_RETRIES", "0")?;
    let fetch_retry_backoff_base_ms = parse_u64("POSTWATCH_FETCH_RETRY_BACKOFF_BASE_MS", "1000")?;

    let startup_delay_secs = parse_u64("POSTWATCH_STARTUP_DELAY_SECS", "10")?;
    let account_pause_secs = parse_u64("POSTWATCH_ACCOUNT_PAUSE_SECS", "900")?;
    let cycle_period_secs = parse_u64("POSTWATCH_CYCLE_PERIOD_SECS", "86400")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        platform_api_base_url,
        platform_bearer_token,
        request_timeout_secs,
        preview_user_agent,
        fetch_max_results,
        fetch_max_retries,
        fetch_retry_backoff_base_ms,
        startup_delay_secs,
        account_pause_secs,
        cycle_period_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "POSTWATCH_ENV".to_string(),
            reason: format!("expected development, test, or production; got {other:?}"),
        }),
    }
}
