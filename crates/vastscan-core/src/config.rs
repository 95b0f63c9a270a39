use crate::app_config::{AppConfig, Environment, DEFAULT_USER_AGENT};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but its value is invalid.
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
/// Returns `ConfigError` if a variable is present but its value is invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
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

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("VASTSCAN_ENV", "development"))?;
    let log_level = or_default("VASTSCAN_LOG_LEVEL", "info");
    let user_agent = or_default("VASTSCAN_USER_AGENT", DEFAULT_USER_AGENT);

    let fetch_timeout_secs = parse_u64("VASTSCAN_FETCH_TIMEOUT_SECS", "10")?;
    let fallback_timeout_secs = parse_u64("VASTSCAN_FALLBACK_TIMEOUT_SECS", "5")?;
    if fallback_timeout_secs > fetch_timeout_secs {
        return Err(invalid(
            "VASTSCAN_FALLBACK_TIMEOUT_SECS",
            format!(
                "must not exceed VASTSCAN_FETCH_TIMEOUT_SECS ({fallback_timeout_secs} > {fetch_timeout_secs})"
            ),
        ));
    }

    let max_depth = parse_u32("VASTSCAN_MAX_DEPTH", "5")?;
    let parallel_branches = parse_bool("VASTSCAN_PARALLEL_BRANCHES", "false")?;
    let max_calls = parse_u32("VASTSCAN_MAX_CALLS", "20")?;
    if max_calls == 0 {
        return Err(invalid("VASTSCAN_MAX_CALLS", "must be at least 1".to_string()));
    }

    Ok(AppConfig {
        env,
        log_level,
        user_agent,
        fetch_timeout_secs,
        fallback_timeout_secs,
        max_depth,
        parallel_branches,
        max_calls,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VASTSCAN_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
