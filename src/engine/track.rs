//! Runtime record for one stream of the current song.

use crate::song::TrackDescriptor;

use super::backend::AudioBackend;
use super::error::{CommandError, LoadError};
use super::mix::{Level, Strip};

/// One loaded stream plus the user's controls for it.
///
/// The handle is exclusively owned. `unload` takes it out, so releasing twice
/// is a no-op rather than a double free on the backend side.
pub struct Track<H> {
    name: String,
    uri: String,
    handle: Option<H>,
    strip: Strip,
    level: Level,
}

/// Read-only view of a track for rendering controls.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackView {
    pub name: String,
    pub volume: f32,
    pub is_muted: bool,
    pub is_solo: bool,
    pub effective_volume: f32,
}

impl<H> Track<H> {
    /// Wrap an already opened handle with default controls: full volume,
    /// neither muted nor soloed.
    pub fn new(name: impl Into<String>, uri: impl Into<String>, handle: H) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            handle: Some(handle),
            strip: Strip::default(),
            level: Level::unity(),
        }
    }

    /// Open `descriptor` through `backend`. Blocks on the backend's I/O.
    pub fn load<B>(backend: &B, descriptor: &TrackDescriptor) -> Result<Self, LoadError>
    where
        B: AudioBackend<Handle = H>,
    {
        let handle = backend.load(&descriptor.url)?;
        Ok(Self::new(&descriptor.name, &descriptor.url, handle))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn strip(&self) -> Strip {
        self.strip
    }

    pub(crate) fn strip_mut(&mut self) -> &mut Strip {
        &mut self.strip
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Change the baseline volume. What is audible only changes once the mix
    /// is recomputed and applied.
    pub fn set_volume(&mut self, volume: f32) {
        self.strip.volume = volume.clamp(0.0, 1.0);
    }

    /// Record `level` and push its volume to the handle. Safe to repeat.
    pub fn apply_effective<B>(&mut self, backend: &B, level: Level) -> Result<(), CommandError>
    where
        B: AudioBackend<Handle = H>,
    {
        self.level = level;
        match self.handle.as_ref() {
            Some(handle) => backend.set_volume(handle, level.effective_volume),
            None => Err(CommandError::Released),
        }
    }

    /// Release the handle. Returns `false` when it was already released.
    pub fn unload<B>(&mut self, backend: &B) -> bool
    where
        B: AudioBackend<Handle = H>,
    {
        match self.handle.take() {
            Some(handle) => {
                backend.unload(handle);
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> TrackView {
        TrackView {
            name: self.name.clone(),
            volume: self.strip.volume,
            is_muted: self.level.solo_forced || (self.strip.user_muted && !self.strip.solo),
            is_solo: self.strip.solo,
            effective_volume: self.level.effective_volume,
        }
    }
}
