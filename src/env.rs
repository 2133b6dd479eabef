//! Environment variable names used by this crate for configuring the
//! layout and layer from services.
//!
//! These are purely helpers; [`JsonLayout`](crate::layout::JsonLayout)
//! itself never reads the environment.

/// Constant written as `application_name` into every record.
pub const LOG_LAYOUT_APPLICATION_NAME_ENV: &str = "LOG_LAYOUT_APPLICATION_NAME";

/// Output charset, e.g. `US-ASCII`, `ISO-8859-1` or `UTF-8`.
pub const LOG_LAYOUT_CHARSET_ENV: &str = "LOG_LAYOUT_CHARSET";

/// Least severe level captured by the layer, e.g. `info`.
pub const LOG_LAYOUT_LEVEL_ENV: &str = "LOG_LAYOUT_LEVEL";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
