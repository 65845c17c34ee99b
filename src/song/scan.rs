use std::path::Path;

use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::catalog::SongError;
use super::model::{Song, TrackDescriptor};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Build a song out of the audio files directly inside `dir`, one track per
/// file, ordered by file name. The directory name is both id and title.
pub fn scan_stems(dir: &Path, settings: &LibrarySettings) -> Result<Song, SongError> {
    let mut stems: Vec<(String, String)> = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .follow_links(settings.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN")
                .to_string();
            stems.push((name, path.display().to_string()));
        }
    }

    if stems.is_empty() {
        return Err(SongError::NoStems(dir.to_path_buf()));
    }

    let title = dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(dir)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string();

    Ok(Song {
        id: title.clone(),
        title,
        tracks: stems
            .into_iter()
            .map(|(name, url)| TrackDescriptor::new(name, url))
            .collect(),
    })
}
