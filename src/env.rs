//! Environment variable names read by [`FormatConfig::from_env`](crate::init::FormatConfig::from_env).
//!
//! These are purely helpers; the rest of the crate never touches the
//! environment.

/// Severity threshold, e.g. `debug` or `warn`.
pub const EXTRAS_LOG_LEVEL_ENV: &str = "EXTRAS_LOG_LEVEL";

/// Line template, e.g. `{level} {shortpath}:{function}:{line} {message}`.
pub const EXTRAS_LOG_TEMPLATE_ENV: &str = "EXTRAS_LOG_TEMPLATE";

/// Extras rendering: `json` or `pairs`.
pub const EXTRAS_LOG_FORMAT_ENV: &str = "EXTRAS_LOG_FORMAT";

/// Whether `{shortpath}` is abbreviated: `true` or `false`.
pub const EXTRAS_LOG_SHORT_PATHS_ENV: &str = "EXTRAS_LOG_SHORT_PATHS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and empty the same.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
