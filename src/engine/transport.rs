//! Group-wide play/pause/stop over every track of one song.
//!
//! Per-track commands are fanned out with one scoped thread per track and all
//! joined before an operation returns: every command is issued before any
//! result is awaited, and play targets a single deadline computed once per
//! call, so no skew accumulates between tracks.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::song::Song;

use super::backend::AudioBackend;
use super::clock::{DurationPolicy, PlaybackClock, Ticker};
use super::error::{CommandError, CommandFailure, EngineError, LoadFailure};
use super::loader::LoadJob;
use super::mix::{self, SoloSession, Strip};
use super::track::{Track, TrackView};

/// Transport state machine.
///
/// `Idle -> Loading -> Ready <-> Playing <-> Paused`; `stop` from
/// Ready/Playing/Paused lands back in `Ready` at position zero. `Released` is
/// final.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Released,
}

impl TransportState {
    fn has_tracks(self) -> bool {
        matches!(
            self,
            TransportState::Ready | TransportState::Playing | TransportState::Paused
        )
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportState::Idle => "idle",
            TransportState::Loading => "loading",
            TransportState::Ready => "ready",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Released => "released",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Head start given to every track before the shared start deadline.
    pub start_buffer: Duration,
    /// Clock update period while playing.
    pub tick: Duration,
    /// How often the clock is snapped to the reference track's real position.
    pub resync: Duration,
    pub duration_policy: DurationPolicy,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            start_buffer: Duration::from_millis(100),
            tick: Duration::from_millis(50),
            resync: Duration::from_millis(500),
            duration_policy: DurationPolicy::First,
        }
    }
}

/// Non-fatal per-track failures of one operation. Tracks that accepted the
/// command are not rolled back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub failures: Vec<CommandFailure>,
}

impl Outcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a (possibly partial) song load.
#[derive(Debug)]
pub struct LoadReport {
    pub loaded: usize,
    pub failures: Vec<LoadFailure>,
    pub duration: Duration,
}

/// Everything a UI needs to render the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportSnapshot {
    pub state: TransportState,
    pub title: Option<String>,
    pub position: Duration,
    pub duration: Duration,
    pub tracks: Vec<TrackView>,
    /// `(arrived, total)` while a load is pending.
    pub loading: Option<(usize, usize)>,
}

pub struct Transport<B: AudioBackend> {
    backend: Arc<B>,
    options: TransportOptions,
    state: TransportState,
    title: Option<String>,
    tracks: Vec<Track<B::Handle>>,
    solo: SoloSession,
    clock: PlaybackClock,
    reference: Option<usize>,
    ticker: Ticker,
    resync: Ticker,
    pending: Option<LoadJob<B::Handle>>,
    reapers: Vec<JoinHandle<()>>,
}

impl<B: AudioBackend> Transport<B> {
    pub fn new(backend: B, options: TransportOptions) -> Self {
        Self::with_shared(Arc::new(backend), options)
    }

    pub fn with_shared(backend: Arc<B>, options: TransportOptions) -> Self {
        let ticker = Ticker::new(options.tick);
        let resync = Ticker::new(options.resync);
        Self {
            backend,
            options,
            state: TransportState::Idle,
            title: None,
            tracks: Vec::new(),
            solo: SoloSession::default(),
            clock: PlaybackClock::new(Duration::ZERO),
            reference: None,
            ticker,
            resync,
            pending: None,
            reapers: Vec::new(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn position(&self) -> Duration {
        self.clock.position_at(Instant::now())
    }

    pub fn duration(&self) -> Duration {
        self.clock.duration()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> Vec<TrackView> {
        self.tracks.iter().map(Track::view).collect()
    }

    /// Positions reported by each track's handle.
    pub fn track_positions(&self) -> Vec<Duration> {
        self.tracks
            .iter()
            .map(|t| {
                t.handle()
                    .map_or(Duration::ZERO, |h| self.backend.position(h))
            })
            .collect()
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            state: self.state,
            title: self.title.clone(),
            position: self.position(),
            duration: self.duration(),
            tracks: self.tracks(),
            loading: self.pending.as_ref().map(|j| (j.received(), j.len())),
        }
    }

    /// Start loading `song`, replacing whatever song was open.
    pub fn begin_load(&mut self, song: &Song) -> Result<(), EngineError> {
        match self.state {
            TransportState::Loading => return Err(EngineError::Busy),
            TransportState::Released => {
                return Err(EngineError::InvalidTransition {
                    op: "load",
                    state: self.state,
                });
            }
            _ => {}
        }

        let released = self.release_tracks();
        if released > 0 {
            info!(released, "closed previous song");
        }

        self.title = Some(song.title.clone());
        self.pending = Some(LoadJob::spawn(self.backend.clone(), &song.tracks));
        self.state = TransportState::Loading;
        info!(id = %song.id, title = %song.title, tracks = song.tracks.len(), "loading song");
        Ok(())
    }

    /// Check on a pending load without blocking. `None` while loaders are
    /// still running (or nothing is loading).
    pub fn poll_load(&mut self) -> Option<Result<LoadReport, EngineError>> {
        let job = self.pending.as_mut()?;
        job.drain();
        if !job.is_complete() {
            return None;
        }
        let job = self.pending.take()?;
        Some(self.complete_load(job))
    }

    /// Block until the pending load has joined.
    pub fn finish_load(&mut self) -> Result<LoadReport, EngineError> {
        let Some(mut job) = self.pending.take() else {
            return Err(EngineError::InvalidTransition {
                op: "finish loading",
                state: self.state,
            });
        };
        job.wait();
        self.complete_load(job)
    }

    /// Load every track of `song` concurrently and wait for all of them.
    ///
    /// Best-effort partial song: tracks that fail are reported and skipped,
    /// the rest stay loaded.
    pub fn load(&mut self, song: &Song) -> Result<LoadReport, EngineError> {
        self.begin_load(song)?;
        self.finish_load()
    }

    fn complete_load(&mut self, job: LoadJob<B::Handle>) -> Result<LoadReport, EngineError> {
        let title = self.title.clone().unwrap_or_default();
        let mut failures = Vec::new();

        for (index, (name, result)) in job.into_results().into_iter().enumerate() {
            match result {
                Ok(track) => self.tracks.push(track),
                Err(error) => {
                    warn!(track = %name, %error, "track failed to load");
                    failures.push(LoadFailure { index, name, error });
                }
            }
        }

        if self.tracks.is_empty() {
            self.state = TransportState::Idle;
            self.title = None;
            return Err(EngineError::NothingLoaded { title, failures });
        }

        let durations: Vec<Option<Duration>> = self
            .tracks
            .iter()
            .map(|t| t.handle().and_then(|h| self.backend.duration(h)))
            .collect();

        let Some((reference, duration)) = self.options.duration_policy.pick(&durations) else {
            self.release_tracks();
            self.state = TransportState::Idle;
            self.title = None;
            return Err(EngineError::UnknownDuration(title));
        };

        self.reference = Some(reference);
        self.clock = PlaybackClock::new(duration);
        self.solo.clear();
        self.apply_mix();
        self.state = TransportState::Ready;

        info!(
            %title,
            loaded = self.tracks.len(),
            failed = failures.len(),
            duration_ms = duration.as_millis() as u64,
            reference = self.tracks[reference].name(),
            "song ready"
        );

        Ok(LoadReport {
            loaded: self.tracks.len(),
            failures,
            duration,
        })
    }

    /// Start every track at one shared deadline, resuming from the clock.
    pub fn play(&mut self) -> Result<Outcome, EngineError> {
        match self.state {
            TransportState::Ready | TransportState::Paused => {}
            state => return Err(EngineError::InvalidTransition { op: "play", state }),
        }

        let deadline = Instant::now() + self.options.start_buffer;
        let resume_at = self.clock.position();
        let outcome = self.dispatch("play", |backend, handle| {
            backend.seek(handle, resume_at)?;
            backend.play(handle, deadline)
        });

        self.clock.start(deadline);
        self.arm_tickers(deadline);
        self.state = TransportState::Playing;
        info!(from_ms = resume_at.as_millis() as u64, "playing");
        Ok(outcome)
    }

    pub fn pause(&mut self) -> Result<Outcome, EngineError> {
        if self.state != TransportState::Playing {
            return Err(EngineError::InvalidTransition {
                op: "pause",
                state: self.state,
            });
        }

        self.disarm_tickers();
        let outcome = self.dispatch("pause", |backend, handle| backend.pause(handle));
        self.clock.freeze(Instant::now());
        self.state = TransportState::Paused;
        info!(at_ms = self.clock.position().as_millis() as u64, "paused");
        Ok(outcome)
    }

    /// Stop every track and rewind the song to zero.
    pub fn stop(&mut self) -> Result<Outcome, EngineError> {
        if !self.state.has_tracks() {
            return Err(EngineError::InvalidTransition {
                op: "stop",
                state: self.state,
            });
        }

        self.disarm_tickers();
        let outcome = self.dispatch("stop", |backend, handle| {
            backend.stop(handle)?;
            backend.seek(handle, Duration::ZERO)
        });
        self.clock.reset();
        self.state = TransportState::Ready;
        info!("stopped");
        Ok(outcome)
    }

    /// Move every track to `position`. While playing, all tracks restart
    /// together on a fresh deadline.
    pub fn seek(&mut self, position: Duration) -> Result<Outcome, EngineError> {
        if !self.state.has_tracks() {
            return Err(EngineError::InvalidTransition {
                op: "seek",
                state: self.state,
            });
        }

        let target = position.min(self.clock.duration());
        let outcome = if self.state == TransportState::Playing {
            let deadline = Instant::now() + self.options.start_buffer;
            let outcome = self.dispatch("seek", |backend, handle| {
                backend.pause(handle)?;
                backend.seek(handle, target)?;
                backend.play(handle, deadline)
            });
            self.clock.seek(target);
            self.clock.start(deadline);
            self.arm_tickers(deadline);
            outcome
        } else {
            let outcome = self.dispatch("seek", |backend, handle| backend.seek(handle, target));
            self.clock.seek(target);
            outcome
        };

        debug!(to_ms = target.as_millis() as u64, "seeked");
        Ok(outcome)
    }

    /// Set the baseline volume of track `index` (clamped to `0.0..=1.0`).
    pub fn set_track_volume(&mut self, index: usize, volume: f32) -> Result<Outcome, EngineError> {
        self.check_index(index)?;
        if !volume.is_finite() {
            return Err(EngineError::InvalidVolume(volume));
        }
        self.tracks[index].set_volume(volume);
        Ok(self.apply_mix())
    }

    pub fn toggle_mute(&mut self, index: usize) -> Result<Outcome, EngineError> {
        self.check_index(index)?;
        let strip = self.tracks[index].strip_mut();
        strip.user_muted = !strip.user_muted;
        debug!(index, muted = strip.user_muted, "mute toggled");
        Ok(self.apply_mix())
    }

    pub fn toggle_solo(&mut self, index: usize) -> Result<Outcome, EngineError> {
        self.check_index(index)?;
        let had_solo = self.tracks.iter().any(|t| t.strip().solo);

        let strip = self.tracks[index].strip_mut();
        strip.solo = !strip.solo;
        debug!(index, solo = strip.solo, "solo toggled");

        let mut strips: Vec<Strip> = self.tracks.iter().map(Track::strip).collect();
        self.solo.observe(had_solo, &mut strips);
        for (track, strip) in self.tracks.iter_mut().zip(strips) {
            *track.strip_mut() = strip;
        }
        Ok(self.apply_mix())
    }

    /// Release every handle, cancelling a pending load. The transport is
    /// unusable afterwards. Returns the number of handles released now;
    /// tracks still loading are released as their loaders finish.
    pub fn teardown(&mut self) -> usize {
        let released = self.cancel_load() + self.release_tracks();
        self.title = None;
        self.state = TransportState::Released;
        info!(released, "transport released");
        released
    }

    /// Close the open song, cancelling a pending load, and go back to `Idle`
    /// so another song can be loaded. A released transport stays released.
    pub fn close(&mut self) -> usize {
        let released = self.cancel_load() + self.release_tracks();
        if self.state != TransportState::Released {
            self.title = None;
            self.state = TransportState::Idle;
        }
        info!(released, "song closed");
        released
    }

    /// Wait for tracks that finished loading after a cancelled load to be
    /// released.
    pub fn wait_released(&mut self) {
        for reaper in self.reapers.drain(..) {
            let _ = reaper.join();
        }
    }

    /// Advance the clock if its timer is due. Resyncs against the reference
    /// track periodically and stops the transport at the end of the song.
    /// Returns `true` when the song ran out.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.state != TransportState::Playing || !self.ticker.fire(now) {
            return false;
        }

        if self.resync.fire(now) {
            let reference = self
                .reference
                .and_then(|i| self.tracks.get(i))
                .and_then(Track::handle);
            if let Some(handle) = reference {
                let actual = self.backend.position(handle);
                debug!(
                    clock_ms = self.clock.position_at(now).as_millis() as u64,
                    actual_ms = actual.as_millis() as u64,
                    "resync"
                );
                self.clock.resync(actual, now);
            }
        }

        self.clock.tick(now);
        if self.clock.is_finished(now) {
            info!("end of song");
            // Per-track failures are already logged by the dispatch.
            let _ = self.stop();
            return true;
        }
        false
    }

    /// Time until the clock timer is next due, if it is armed.
    pub fn next_tick_in(&self, now: Instant) -> Option<Duration> {
        self.ticker.remaining(now)
    }

    fn check_index(&self, index: usize) -> Result<(), EngineError> {
        if self.state == TransportState::Loading {
            return Err(EngineError::Busy);
        }
        if index >= self.tracks.len() {
            return Err(EngineError::TrackIndex(index));
        }
        Ok(())
    }

    fn arm_tickers(&mut self, deadline: Instant) {
        self.ticker.arm(deadline);
        self.resync.arm(deadline + self.options.resync);
    }

    fn disarm_tickers(&mut self) {
        self.ticker.disarm();
        self.resync.disarm();
    }

    /// Recompute the mix over all tracks and push every level.
    fn apply_mix(&mut self) -> Outcome {
        let strips: Vec<Strip> = self.tracks.iter().map(Track::strip).collect();
        let levels = mix::recompute(&strips);
        let backend = self.backend.as_ref();

        let mut outcome = Outcome::default();
        for (index, (track, level)) in self.tracks.iter_mut().zip(levels).enumerate() {
            if let Err(error) = track.apply_effective(backend, level) {
                outcome.failures.push(CommandFailure {
                    index,
                    name: track.name().to_string(),
                    error,
                });
            }
        }
        self.log_failures("set volume", &outcome);
        outcome
    }

    /// Issue `command` to every track concurrently and join all of them.
    fn dispatch<F>(&self, op: &'static str, command: F) -> Outcome
    where
        F: Fn(&B, &B::Handle) -> Result<(), CommandError> + Sync,
    {
        let backend = self.backend.as_ref();
        let command = &command;

        let results: Vec<Result<(), CommandError>> = thread::scope(|scope| {
            let workers: Vec<_> = self
                .tracks
                .iter()
                .map(|track| {
                    scope.spawn(move || match track.handle() {
                        Some(handle) => command(backend, handle),
                        None => Err(CommandError::Released),
                    })
                })
                .collect();

            workers
                .into_iter()
                .map(|w| w.join().unwrap_or(Err(CommandError::Panicked { op })))
                .collect()
        });

        let failures = results
            .into_iter()
            .zip(&self.tracks)
            .enumerate()
            .filter_map(|(index, (result, track))| {
                result.err().map(|error| CommandFailure {
                    index,
                    name: track.name().to_string(),
                    error,
                })
            })
            .collect();

        let outcome = Outcome { failures };
        self.log_failures(op, &outcome);
        outcome
    }

    fn log_failures(&self, op: &str, outcome: &Outcome) {
        for failure in &outcome.failures {
            warn!(op, track = %failure.name, error = %failure.error, "track command failed");
        }
    }

    fn cancel_load(&mut self) -> usize {
        match self.pending.take() {
            Some(job) => {
                let (now, reaper) = job.cancel(self.backend.clone());
                self.reapers.push(reaper);
                now
            }
            None => 0,
        }
    }

    fn release_tracks(&mut self) -> usize {
        self.disarm_tickers();
        let backend = self.backend.as_ref();
        let released = self
            .tracks
            .iter_mut()
            .filter(|t| t.is_loaded())
            .map(|t| t.unload(backend))
            .filter(|&r| r)
            .count();
        self.tracks.clear();
        self.solo.clear();
        self.reference = None;
        self.clock = PlaybackClock::new(Duration::ZERO);
        released
    }
}

impl<B: AudioBackend> Drop for Transport<B> {
    fn drop(&mut self) {
        if self.state != TransportState::Released {
            self.teardown();
        }
    }
}
