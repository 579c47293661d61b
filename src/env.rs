/// Environment variable names used by this crate for convenient
/// configuration from deployment environments.
///
/// These are purely helpers; the core types remain decoupled from
/// environment access.
use crate::config::RelayConfig;

/// Application name stamped on every record.
pub const LOG_RELAY_APPLICATION_NAME_ENV: &str = "LOG_RELAY_APPLICATION_NAME";

/// Application layer stamped on every record.
pub const LOG_RELAY_APPLICATION_LAYER_ENV: &str = "LOG_RELAY_APPLICATION_LAYER";

/// Directory the file sink appends into.
pub const LOG_RELAY_DIRECTORY_ENV: &str = "LOG_RELAY_DIRECTORY";

/// Schema selector: `1`/`true` switches to the hierarchical schema.
pub const LOG_RELAY_MAP_TO_ECS_ENV: &str = "LOG_RELAY_MAP_TO_ECS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Apply any overrides present in the environment onto `config`. Unset
/// variables leave the corresponding field untouched.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    if let Ok(name) = std::env::var(LOG_RELAY_APPLICATION_NAME_ENV) {
        config.application_name = name;
    }
    if let Ok(layer) = std::env::var(LOG_RELAY_APPLICATION_LAYER_ENV) {
        config.application_layer = layer;
    }
    if let Ok(dir) = std::env::var(LOG_RELAY_DIRECTORY_ENV) {
        config.log_directory = dir;
    }
    if let Ok(flag) = std::env::var(LOG_RELAY_MAP_TO_ECS_ENV) {
        config.map_to_ecs = matches!(flag.as_str(), "1" | "true" | "TRUE" | "True");
    }
}
