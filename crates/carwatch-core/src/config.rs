use crate::app_config::{AppConfig, ScheduleTime};
use crate::ConfigError;

pub const DEFAULT_EXPIRY_KEYS: &[&str] = &["expires", "expiresAt", "expire", "exp"];
pub const DEFAULT_HASH_KEYS: &[&str] = &["hash", "token", "signature", "sign"];

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
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
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

    let parse_time = |var: &str, default: &str| -> Result<ScheduleTime, ConfigError> {
        or_default(var, default)
            .parse::<ScheduleTime>()
            .map_err(|reason| invalid(var, reason))
    };

    let database_url = require("DATABASE_URL")?;
    let log_level = or_default("CARWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("CARWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CARWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CARWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let base_url = or_default("CARWATCH_BASE_URL", "https://auto.ria.com")
        .trim_end_matches('/')
        .to_string();
    let search_path = or_default("CARWATCH_SEARCH_PATH", "/uk/car/used/");
    let user_agent = or_default("CARWATCH_USER_AGENT", "Mozilla/5.0");
    let accept_language = or_default("CARWATCH_ACCEPT_LANGUAGE", "uk-UA,uk;q=0.9,en;q=0.8");
    let request_timeout_secs = parse_u64("CARWATCH_REQUEST_TIMEOUT_SECS", "30")?;

    let max_pages = match lookup("CARWATCH_MAX_PAGES") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<u32>()
                .map_err(|e| invalid("CARWATCH_MAX_PAGES", e.to_string()))?,
        ),
        _ => None,
    };

    let browser_enabled = parse_bool(&or_default("CARWATCH_BROWSER_ENABLED", "true"))
        .ok_or_else(|| invalid("CARWATCH_BROWSER_ENABLED", "expected true or false".into()))?;
    let chrome_path = lookup("CARWATCH_CHROME_PATH").ok().map(PathBuf::from);

    let plate_pattern = lookup("CARWATCH_PLATE_PATTERN")
        .ok()
        .filter(|p| !p.trim().is_empty());
    let token_expiry_keys = parse_key_list(
        lookup("CARWATCH_TOKEN_EXPIRY_KEYS").ok().as_deref(),
        DEFAULT_EXPIRY_KEYS,
    );
    let token_hash_keys = parse_key_list(
        lookup("CARWATCH_TOKEN_HASH_KEYS").ok().as_deref(),
        DEFAULT_HASH_KEYS,
    );

    let timezone = or_default("TZ", "Europe/Kyiv");
    let scrape_time = parse_time("SCRAPE_TIME", "12:00")?;
    let dump_time = parse_time("DUMP_TIME", "12:05")?;
    let dumps_dir = PathBuf::from(or_default("CARWATCH_DUMPS_DIR", "./dumps"));

    Ok(AppConfig {
        database_url,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        base_url,
        search_path,
        user_agent,
        accept_language,
        request_timeout_secs,
        max_pages,
        browser_enabled,
        chrome_path,
        plate_pattern,
        token_expiry_keys,
        token_hash_keys,
        timezone,
        scrape_time,
        dump_time,
        dumps_dir,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Splits a comma-separated alias list, falling back to `defaults` when the
/// variable is unset or contains no usable entries.
fn parse_key_list(raw: Option<&str>, defaults: &[&str]) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    if parsed.is_empty() {
        defaults.iter().map(|k| (*k).to_string()).collect()
    } else {
        parsed
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
