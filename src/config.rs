use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::record::Category;

/// Destination toggles for one category. The two flags are independent: a
/// category may write to both, either, or neither destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryToggles {
    pub write_to_file: bool,
    pub write_to_console: bool,
}

impl CategoryToggles {
    pub const CONSOLE_ONLY: CategoryToggles = CategoryToggles {
        write_to_file: false,
        write_to_console: true,
    };

    pub const FILE_AND_CONSOLE: CategoryToggles = CategoryToggles {
        write_to_file: true,
        write_to_console: true,
    };

    pub const SILENT: CategoryToggles = CategoryToggles {
        write_to_file: false,
        write_to_console: false,
    };
}

impl Default for CategoryToggles {
    fn default() -> Self {
        CategoryToggles::CONSOLE_ONLY
    }
}

/// Relay configuration: application identity, schema selection, file sink
/// location and per-category destination toggles.
///
/// Errors default to file+console so they are never silently dropped; the
/// other categories default to console only.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub application_name: String,
    pub application_layer: String,

    /// Shape selector: hierarchical schema when true, flat when false.
    pub map_to_ecs: bool,

    /// Directory the file sink appends into.
    pub log_directory: String,

    /// File name prefix, e.g. `relay` gives `relay-usage-2024-01-31.log`.
    pub file_prefix: String,

    pub usage: CategoryToggles,
    pub diagnostics: CategoryToggles,
    pub errors: CategoryToggles,
    pub performance: CategoryToggles,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            application_name: String::new(),
            application_layer: String::new(),
            map_to_ecs: false,
            log_directory: "logs".to_string(),
            file_prefix: "relay".to_string(),
            usage: CategoryToggles::CONSOLE_ONLY,
            diagnostics: CategoryToggles::CONSOLE_ONLY,
            errors: CategoryToggles::FILE_AND_CONSOLE,
            performance: CategoryToggles::CONSOLE_ONLY,
        }
    }
}

impl RelayConfig {
    /// Destination toggles for the given category.
    pub fn toggles(&self, category: Category) -> CategoryToggles {
        match category {
            Category::Usage => self.usage,
            Category::Diagnostic => self.diagnostics,
            Category::Error => self.errors,
            Category::Performance => self.performance,
        }
    }

    /// Load and validate configuration from a TOML file. Missing keys fall
    /// back to the defaults above.
    pub fn load(path: &Path) -> Result<RelayConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "application_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error type for configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_default_to_file_and_console() {
        let config = RelayConfig::default();
        assert_eq!(config.errors, CategoryToggles::FILE_AND_CONSOLE);
    }

    #[test]
    fn other_categories_default_to_console_only() {
        let config = RelayConfig::default();
        for category in [Category::Usage, Category::Diagnostic, Category::Performance] {
            assert_eq!(config.toggles(category), CategoryToggles::CONSOLE_ONLY);
        }
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            application_name = "billing"
            application_layer = "api"

            [usage]
            write_to_file = true
            "#,
        )
        .unwrap();

        assert_eq!(config.application_name, "billing");
        assert!(config.usage.write_to_file);
        // Unspecified half of the pair keeps its default.
        assert!(config.usage.write_to_console);
        assert_eq!(config.errors, CategoryToggles::FILE_AND_CONSOLE);
        assert_eq!(config.log_directory, "logs");
        assert!(!config.map_to_ecs);
    }

    #[test]
    fn load_rejects_missing_application_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "application_layer = \"api\"\n").unwrap();

        let err = RelayConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
