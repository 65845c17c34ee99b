use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::Song;

#[derive(Debug, Error)]
pub enum SongError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid song catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no song with id \"{0}\"")]
    NotFound(String),

    #[error("no audio files in {0}")]
    NoStems(PathBuf),
}

/// A list of songs, as served by the catalog file.
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl SongCatalog {
    pub fn new(songs: Vec<Song>) -> Self {
        Self { songs }
    }

    /// Parse a JSON array of songs.
    pub fn from_path(path: &Path) -> Result<Self, SongError> {
        let text = fs::read_to_string(path).map_err(|source| SongError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let songs: Vec<Song> = serde_json::from_str(&text).map_err(|source| SongError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { songs })
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn find(&self, id: &str) -> Option<&Song> {
        self.songs.iter().find(|s| s.id == id)
    }

    /// Like `find`, but owned and with an error for unknown ids.
    pub fn resolve(&self, id: &str) -> Result<Song, SongError> {
        self.find(id)
            .cloned()
            .ok_or_else(|| SongError::NotFound(id.to_string()))
    }
}
