use std::path::Path;

use config::{Config, ConfigError, Environment, File};

use taskminder_models::settings::Settings;

/// Loads settings from `appsettings.toml` in the working directory,
/// `appsettings.local.toml` and `APP_*` environment variables.
pub fn load() -> Result<Settings, ConfigError> {
    load_from(Path::new("."), environment())
}

fn environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_from(dir: &Path, environment: Environment) -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::from(dir.join("appsettings")).required(true))
        .add_source(File::from(dir.join("appsettings.local")).required(false))
        .add_source(environment)
        .build()?;

    settings.try_deserialize()
}
