use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config;
use crate::engine::{DurationPolicy, TransportOptions};
use crate::song::{Song, SongCatalog, SongError, scan_stems};

pub const USAGE: &str = "usage: stemdeck <catalog.json> <song-id> | stemdeck [stem-dir]";

/// Where the song to open comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongSource {
    Catalog { path: PathBuf, id: String },
    Directory(PathBuf),
}

impl fmt::Display for SongSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongSource::Catalog { path, id } => write!(f, "{} #{}", path.display(), id),
            SongSource::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Interpret the command line (without the program name). No argument means
/// the current directory is a stem directory.
pub fn parse_args(args: &[String]) -> Result<SongSource, String> {
    match args {
        [] => std::env::current_dir()
            .map(SongSource::Directory)
            .map_err(|e| format!("cannot read current directory: {e}")),
        [one] if is_catalog(Path::new(one)) => Err(missing_song_id(Path::new(one))),
        [dir] => Ok(SongSource::Directory(PathBuf::from(dir))),
        [catalog, id] => Ok(SongSource::Catalog {
            path: PathBuf::from(catalog),
            id: id.clone(),
        }),
        _ => Err(USAGE.to_string()),
    }
}

/// Name the catalog's songs so the missing id can be picked from the list.
fn missing_song_id(catalog: &Path) -> String {
    let mut lines = vec![format!("missing song id for catalog {}", catalog.display())];
    match SongCatalog::from_path(catalog) {
        Ok(found) if found.songs().is_empty() => lines.push("the catalog has no songs".into()),
        Ok(found) => {
            lines.push("available songs:".into());
            lines.extend(
                found
                    .songs()
                    .iter()
                    .map(|song| format!("  {}  {}", song.id, song.title)),
            );
        }
        Err(e) => lines.push(e.to_string()),
    }
    lines.push(USAGE.into());
    lines.join("\n")
}

fn is_catalog(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

pub fn resolve_song(
    source: &SongSource,
    library: &config::LibrarySettings,
) -> Result<Song, SongError> {
    match source {
        SongSource::Catalog { path, id } => SongCatalog::from_path(path)?.resolve(id),
        SongSource::Directory(dir) => scan_stems(dir, library),
    }
}

/// Map transport settings onto engine options.
pub fn transport_options(settings: &config::Settings) -> TransportOptions {
    let t = &settings.transport;
    TransportOptions {
        start_buffer: Duration::from_millis(t.start_buffer_ms),
        tick: Duration::from_millis(t.tick_ms),
        resync: Duration::from_millis(t.resync_ms),
        duration_policy: match t.duration_policy {
            config::DurationPolicySetting::First => DurationPolicy::First,
            config::DurationPolicySetting::Longest => DurationPolicy::Longest,
            config::DurationPolicySetting::Shortest => DurationPolicy::Shortest,
        },
    }
}
