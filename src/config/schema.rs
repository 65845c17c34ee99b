use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/stemdeck/config.toml` or
/// `~/.config/stemdeck/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `STEMDECK__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transport: TransportSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
    pub library: LibrarySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Delay between issuing play and the shared start instant (milliseconds).
    /// Absorbs per-track dispatch latency.
    pub start_buffer_ms: u64,
    /// Playback clock update period (milliseconds).
    pub tick_ms: u64,
    /// How often the clock is corrected against the reference track (milliseconds).
    pub resync_ms: u64,
    /// Which track defines the song length when tracks disagree.
    pub duration_policy: DurationPolicySetting,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            start_buffer_ms: 100,
            tick_ms: 50,
            resync_ms: 500,
            duration_policy: DurationPolicySetting::First,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationPolicySetting {
    #[serde(alias = "first-track", alias = "first_track")]
    First,
    #[serde(alias = "max", alias = "maximum")]
    Longest,
    #[serde(alias = "min", alias = "minimum")]
    Shortest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Volume change per key press.
    pub volume_step: f32,
    /// Number of seconds to seek when pressing `H` / `L`.
    pub seek_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            volume_step: 0.05,
            seek_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ stemdeck ~ ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions treated as stems (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks when scanning a stem directory.
    pub follow_links: bool,
    /// Whether to include hidden files (dotfiles).
    pub include_hidden: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is not set, e.g. `info` or `stemdeck=debug`.
    pub level: String,
    /// Log file. The terminal belongs to the UI, so logs never go to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingSettings {
    pub fn file_path(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("stemdeck.log"))
    }
}
