use std::env;
use std::path::{Path, PathBuf};

use super::schema::Settings;

const ENV_PREFIX: &str = "STEMDECK";
const PATH_VAR: &str = "STEMDECK_CONFIG_PATH";

/// Configuration loading helpers.
///
/// Precedence, highest first: `STEMDECK__SECTION__KEY` environment
/// variables, the optional config file, struct defaults.
impl Settings {
    /// Load settings from the environment and the resolved config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(resolve_config_path().as_deref())
    }

    /// Like `load`, with an explicit (optional, possibly missing) file.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Check value ranges. All problems are reported in one message.
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.transport;
        let step = self.controls.volume_step;

        let problems: Vec<&str> = [
            (t.tick_ms == 0, "transport.tick_ms must be >= 1"),
            (t.resync_ms == 0, "transport.resync_ms must be >= 1"),
            (
                t.start_buffer_ms > 2000,
                "transport.start_buffer_ms must be <= 2000",
            ),
            (
                !(step > 0.0 && step <= 1.0),
                "controls.volume_step must be in (0, 1]",
            ),
        ]
        .into_iter()
        .filter_map(|(bad, msg)| bad.then_some(msg))
        .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

/// `STEMDECK_CONFIG_PATH` when set, else the XDG default.
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os(PATH_VAR)
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/stemdeck/config.toml`, falling back to
/// `~/.config/stemdeck/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .map(|dir| dir.join("stemdeck").join("config.toml"))
}
