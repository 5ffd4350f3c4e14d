use anyhow::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Default cap on consecutive frequency steps that produce no candidate.
pub const DEFAULT_MAX_EMPTY_STEPS: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub expansion: ExpansionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Consecutive empty frequency steps tolerated before evaluation gives up.
    pub max_empty_steps: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_empty_steps: DEFAULT_MAX_EMPTY_STEPS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Returns a configuration builder seeded with the default values.
    ///
    /// ## Errors
    /// Returns an error if a default value cannot be set.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default(
                "expansion.max_empty_steps",
                i64::from(DEFAULT_MAX_EMPTY_STEPS),
            )?
            .set_default("logging.level", "info")?)
    }

    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `sundial.toml` into a `Settings`.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails,
    /// or if the loaded values are out of range.
    pub fn load() -> Result<Self> {
        Self::load_with(Self::environment())
    }

    /// Environment source: `SUNDIAL_` prefix, `__` between nesting levels,
    /// e.g. `SUNDIAL_EXPANSION__MAX_EMPTY_STEPS`.
    fn environment() -> Environment {
        Environment::with_prefix("SUNDIAL")
            .prefix_separator("_")
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
    }

    fn load_with(environment: Environment) -> Result<Self> {
        let settings = Self::defaults()?
            // TOML file
            .add_source(config::File::with_name("sundial.toml").required(false))
            // Env file
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Checks value ranges that deserialization alone cannot express.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` if `expansion.max_empty_steps` is zero,
    /// or `CoreError::ValidationError` if `logging.level` is blank.
    pub fn validate(&self) -> CoreResult<()> {
        if self.expansion.max_empty_steps == 0 {
            return Err(CoreError::ConfigError(
                "expansion.max_empty_steps must be at least 1".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "logging.level must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(settings = ?settings, "Configuration loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Settings {
        Settings::defaults()
            .expect("defaults")
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize")
    }

    #[test_log::test]
    fn test_defaults_apply_without_sources() {
        let settings = from_toml("");
        assert_eq!(settings.expansion.max_empty_steps, DEFAULT_MAX_EMPTY_STEPS);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let settings = from_toml(
            r#"
            [expansion]
            max_empty_steps = 50

            [logging]
            level = "trace"
            "#,
        );
        assert_eq!(settings.expansion.max_empty_steps, 50);
        assert_eq!(settings.logging.level, "trace");
    }

    #[test]
    fn test_validate_rejects_zero_empty_steps() {
        let settings = from_toml("[expansion]\nmax_empty_steps = 0\n");
        let err = settings.validate().expect_err("zero must be rejected");
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_validate_rejects_blank_log_level() {
        let settings = from_toml("[logging]\nlevel = \"  \"\n");
        let err = settings.validate().expect_err("blank level must be rejected");
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let vars = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Settings::environment().source(Some(vars))
    }

    #[test_log::test]
    fn test_environment_overrides_defaults() {
        let settings = Settings::load_with(environment(&[
            ("SUNDIAL_EXPANSION__MAX_EMPTY_STEPS", "250"),
            ("SUNDIAL_LOGGING__LEVEL", "debug"),
            ("OTHER_EXPANSION__MAX_EMPTY_STEPS", "9"),
        ]))
        .expect("load");
        assert_eq!(settings.expansion.max_empty_steps, 250);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_environment_values_are_validated() {
        let vars = environment(&[("SUNDIAL_EXPANSION__MAX_EMPTY_STEPS", "0")]);
        let err = Settings::load_with(vars).expect_err("zero must be rejected");
        assert!(err.downcast_ref::<CoreError>().is_some());
    }

    #[test]
    fn test_expansion_config_default_matches_loader_default() {
        let config = ExpansionConfig::default();
        assert_eq!(config.max_empty_steps, from_toml("").expansion.max_empty_steps);
    }
}
