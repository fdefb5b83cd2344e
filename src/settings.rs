//! Layered service settings.
//!
//! Values are read in order, later sources overriding earlier ones:
//! built-in defaults, an optional TOML file, then `RULEWARD_` environment
//! variables where `__` separates nested keys (`RULEWARD_SERVER__PORT=8080`).

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::Error;

const ENV_PREFIX: &str = "RULEWARD";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 7007,
        }
    }
}

impl ServerSettings {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

/// Identity of the resource type this service owns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    pub plugin_id: String,
    pub resource_type: String,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            plugin_id: "catalog".to_owned(),
            resource_type: "catalog-entity".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub integration: IntegrationSettings,
}

impl Settings {
    /// Load settings from defaults, `path` (if given) and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file is missing or unreadable, or a
    /// value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        Self::finish(builder, environment())
    }

    /// Load settings from TOML text and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or mistyped values.
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder, environment())
    }

    fn finish(builder: ConfigBuilder<DefaultState>, env: Environment) -> Result<Self, Error> {
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
