//! `rodio`-backed implementation of the engine's audio handles.
//!
//! Every track gets its own `Sink` attached to the shared output mixer, so
//! rodio's mixer thread does the summing. Sinks start paused; the engine
//! decides when they run.
//!
//! A sink forgets its source once the source runs out, so seeking never goes
//! through `Sink::try_seek`. The track is reopened and a fresh sink is cued at
//! the target with `Source::skip_duration`, which also makes a track that
//! already ended playable again.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use lofty::prelude::*;
use rodio::mixer::Mixer;
use rodio::{Decoder, Sink, Source};
use tracing::debug;

use crate::engine::{AudioBackend, CommandError, LoadError};

pub struct RodioBackend {
    mixer: Mixer,
}

pub struct RodioTrack {
    path: PathBuf,
    duration: Option<Duration>,
    deck: Mutex<Deck>,
}

/// The live sink and the song position it was cued at.
struct Deck {
    sink: Sink,
    offset: Duration,
}

impl RodioTrack {
    fn deck(&self, op: &'static str) -> Result<MutexGuard<'_, Deck>, CommandError> {
        self.deck.lock().map_err(|e| rejected(op, e))
    }
}

impl RodioBackend {
    pub fn new(mixer: &Mixer) -> Self {
        Self {
            mixer: mixer.clone(),
        }
    }

    /// A paused sink on the shared mixer playing `source`.
    fn cue<S: Source + Send + 'static>(&self, source: S, volume: f32) -> Sink {
        let sink = Sink::connect_new(&self.mixer);
        sink.pause();
        sink.set_volume(volume);
        sink.append(source);
        sink
    }
}

/// Map a track uri to a local path. Plain paths and `file://` urls are
/// accepted; fetching remote streams is not this backend's job.
pub(crate) fn resolve_path(uri: &str) -> Result<PathBuf, LoadError> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if uri.contains("://") {
        return Err(LoadError::Unsupported(uri.to_string()));
    }
    Ok(PathBuf::from(uri))
}

/// Ask the container's tags for a length when the decoder can't tell.
fn tagged_duration(path: &Path) -> Option<Duration> {
    lofty::read_from_path(path)
        .ok()
        .map(|tagged| tagged.properties().duration())
        .filter(|d| !d.is_zero())
}

fn rejected(op: &'static str, err: impl std::fmt::Display) -> CommandError {
    CommandError::Rejected {
        op,
        reason: err.to_string(),
    }
}

impl AudioBackend for RodioBackend {
    type Handle = RodioTrack;

    fn load(&self, uri: &str) -> Result<RodioTrack, LoadError> {
        let path = resolve_path(uri)?;
        let file = File::open(&path).map_err(|source| LoadError::Unreachable {
            uri: uri.to_string(),
            source,
        })?;

        let source = Decoder::try_from(file).map_err(|e| LoadError::Malformed {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        let duration = source.total_duration().or_else(|| tagged_duration(&path));
        let sink = self.cue(source, 1.0);
        debug!(uri, duration_ms = duration.map(|d| d.as_millis() as u64), "stream opened");

        Ok(RodioTrack {
            path,
            duration,
            deck: Mutex::new(Deck {
                sink,
                offset: Duration::ZERO,
            }),
        })
    }

    fn play(&self, handle: &RodioTrack, start_at: Instant) -> Result<(), CommandError> {
        // rodio has no scheduled start; every track's worker sleeps to the
        // same instant and un-pauses its sink.
        let wait = start_at.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        handle.deck("play")?.sink.play();
        Ok(())
    }

    fn pause(&self, handle: &RodioTrack) -> Result<(), CommandError> {
        handle.deck("pause")?.sink.pause();
        Ok(())
    }

    // `Sink::stop` would end the track for good. Pausing keeps it; the
    // transport rewinds with a seek.
    fn stop(&self, handle: &RodioTrack) -> Result<(), CommandError> {
        handle.deck("stop")?.sink.pause();
        Ok(())
    }

    fn seek(&self, handle: &RodioTrack, position: Duration) -> Result<(), CommandError> {
        let file = File::open(&handle.path).map_err(|e| rejected("seek", e))?;
        let source = Decoder::try_from(file).map_err(|e| rejected("seek", e))?;

        let mut deck = handle.deck("seek")?;
        let sink = self.cue(source.skip_duration(position), deck.sink.volume());
        if !deck.sink.is_paused() {
            sink.play();
        }
        let previous = std::mem::replace(&mut deck.sink, sink);
        previous.stop();
        deck.offset = position;
        Ok(())
    }

    fn set_volume(&self, handle: &RodioTrack, volume: f32) -> Result<(), CommandError> {
        handle.deck("volume")?.sink.set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    fn duration(&self, handle: &RodioTrack) -> Option<Duration> {
        handle.duration
    }

    fn position(&self, handle: &RodioTrack) -> Duration {
        handle
            .deck
            .lock()
            .map(|deck| deck.offset + deck.sink.get_pos())
            .unwrap_or_default()
    }

    fn unload(&self, handle: RodioTrack) {
        let deck = handle.deck.into_inner().unwrap_or_else(PoisonError::into_inner);
        deck.sink.stop();
    }
}
