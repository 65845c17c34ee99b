//! Application model: `App`.

use crate::audio::{PlayerStatus, StatusHandle};

/// The main application model.
#[derive(Default)]
pub struct App {
    /// Cursor over the tracks of the current song.
    pub selected: usize,
    pub status_handle: Option<StatusHandle>,
    /// Where the song came from (catalog entry or stem directory), for the
    /// status box.
    pub source: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the handle the control thread publishes its status to.
    pub fn set_status_handle(&mut self, h: StatusHandle) {
        self.status_handle = Some(h);
    }

    pub fn set_source(&mut self, source: String) {
        self.source = Some(source);
    }

    /// Copy of the latest published status. Default while nothing has been
    /// published or the lock is poisoned.
    pub fn status(&self) -> PlayerStatus {
        self.status_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|s| s.clone()))
            .unwrap_or_default()
    }

    /// Move the cursor down, wrapping to the top.
    pub fn next(&mut self, track_count: usize) {
        if track_count == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % track_count;
    }

    /// Move the cursor up, wrapping to the bottom.
    pub fn prev(&mut self, track_count: usize) {
        if track_count == 0 {
            self.selected = 0;
            return;
        }
        self.selected = if self.selected == 0 {
            track_count - 1
        } else {
            self.selected - 1
        };
    }

    /// Keep the cursor inside the track list after a (re)load.
    pub fn clamp_selection(&mut self, track_count: usize) {
        if self.selected >= track_count {
            self.selected = track_count.saturating_sub(1);
        }
    }
}
