mod settings;

use ::config::{Config, ConfigError, Environment, File};
use std::path::Path;

pub use settings::{
    LoggingSettings, ProjectSettings, PubSubSettings, RetrySettings, Settings, StorageSettings,
};

/// Prefix of the structured environment overrides, e.g. `CLOUDUTILS__STORAGE__BUCKET`.
pub const ENV_PREFIX: &str = "CLOUDUTILS";

/// Loads the configuration from `config/default` and the environment.
///
/// # Errors
///
/// Returns an error if a source is malformed or a value has the wrong type
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Loads the configuration from an optional file (any format the `config` crate
/// recognises by extension), then `CLOUDUTILS__SECTION__KEY` variables, then the
/// `PROJECT_ID` and `AUTH_FILE` variables. Later sources win; anything left unset
/// keeps its default.
///
/// # Errors
///
/// Returns an error if a source is malformed or a value has the wrong type
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("project.project_id", std::env::var("PROJECT_ID").ok())?
        .set_override_option("project.credentials_file", std::env::var("AUTH_FILE").ok())?;

    builder.build()?.try_deserialize()
}
