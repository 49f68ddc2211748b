//! Injector configuration. An [InjectorClass](crate::injector::InjectorClass) uses the default
//! config unless given one explicitly, and passes its config on to subclasses.
//!
//! The default values can be overwritten by environment variables prefixed with `JENI_` or the
//! `jeni.json` file, when loading with [InjectorConfig::init_from_environment].

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "JENI";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "jeni.json";

/// Behavior switches of injector classes and their injectors.
#[non_exhaustive]
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct InjectorConfig {
    /// Should re-registering a provider for the same base key on the same class replace the
    /// previous registration, or fail.
    pub allow_definition_overriding: bool,
    /// Should an injector dropped without explicit close close its providers.
    pub close_on_drop: bool,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            allow_definition_overriding: true,
            close_on_drop: true,
        }
    }
}

impl From<OptionalInjectorConfig> for InjectorConfig {
    fn from(value: OptionalInjectorConfig) -> Self {
        let default = Self::default();
        Self {
            allow_definition_overriding: value
                .allow_definition_overriding
                .unwrap_or(default.allow_definition_overriding),
            close_on_drop: value.close_on_drop.unwrap_or(default.close_on_drop),
        }
    }
}

impl InjectorConfig {
    /// Loads the config from [CONFIG_FILE], if present, and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Self::init_from_config(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX)),
        )
    }

    fn init_from_config(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .build()
            .and_then(|config| config.try_deserialize::<OptionalInjectorConfig>())
            .map(|config| config.into())
    }

    #[inline]
    pub fn with_definition_overriding(mut self, allow_definition_overriding: bool) -> Self {
        self.allow_definition_overriding = allow_definition_overriding;
        self
    }

    #[inline]
    pub fn with_close_on_drop(mut self, close_on_drop: bool) -> Self {
        self.close_on_drop = close_on_drop;
        self
    }
}

#[derive(Deserialize)]
struct OptionalInjectorConfig {
    allow_definition_overriding: Option<bool>,
    close_on_drop: Option<bool>,
}
