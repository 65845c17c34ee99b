//! In-memory `AudioBackend` for tests.
//!
//! Positions advance with the wall clock from each handle's start deadline,
//! which is enough to observe skew between tracks.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::backend::AudioBackend;
use super::error::{CommandError, LoadError};

#[derive(Debug)]
pub(crate) struct MockHandle {
    pub id: usize,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MockCmd {
    Play(Instant),
    Pause,
    Stop,
    Seek(Duration),
    Volume(f32),
}

#[derive(Debug, Default)]
struct HandleState {
    uri: String,
    base: Duration,
    started: Option<Instant>,
    volume: f32,
}

impl HandleState {
    fn position(&self, now: Instant) -> Duration {
        match self.started {
            Some(at) => self.base + now.saturating_duration_since(at),
            None => self.base,
        }
    }
}

#[derive(Default)]
struct Inner {
    handles: HashMap<usize, HandleState>,
    log: Vec<(String, MockCmd)>,
    released: Vec<String>,
}

#[derive(Default)]
pub(crate) struct MockBackend {
    durations: HashMap<String, Option<Duration>>,
    failing: HashSet<String>,
    next_id: AtomicUsize,
    inner: Mutex<Inner>,
    gate: Option<(Mutex<bool>, Condvar)>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loadable uri with a known length in milliseconds.
    pub fn with_track(mut self, uri: &str, duration_ms: u64) -> Self {
        self.durations
            .insert(uri.to_string(), Some(Duration::from_millis(duration_ms)));
        self
    }

    /// Register a loadable uri whose length is unknown.
    pub fn with_unsized_track(mut self, uri: &str) -> Self {
        self.durations.insert(uri.to_string(), None);
        self
    }

    /// Commands to this uri's handle fail.
    pub fn with_failing_commands(mut self, uri: &str) -> Self {
        self.failing.insert(uri.to_string());
        self
    }

    /// Loads block until `open_gate` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some((Mutex::new(false), Condvar::new()));
        self
    }

    pub fn open_gate(&self) {
        if let Some((open, cvar)) = &self.gate {
            *open.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    pub fn released(&self) -> Vec<String> {
        let mut r = self.inner.lock().unwrap().released.clone();
        r.sort();
        r
    }

    pub fn live_handles(&self) -> usize {
        self.inner.lock().unwrap().handles.len()
    }

    pub fn commands_for(&self, uri: &str) -> Vec<MockCmd> {
        self.inner
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|(u, _)| u == uri)
            .map(|(_, c)| *c)
            .collect()
    }

    pub fn play_deadlines(&self) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .log
            .iter()
            .filter_map(|(_, c)| match c {
                MockCmd::Play(at) => Some(*at),
                _ => None,
            })
            .collect()
    }

    pub fn volume_of(&self, uri: &str) -> Option<f32> {
        self.inner
            .lock()
            .unwrap()
            .handles
            .values()
            .find(|h| h.uri == uri)
            .map(|h| h.volume)
    }

    fn command(
        &self,
        handle: &MockHandle,
        op: &'static str,
        cmd: MockCmd,
    ) -> Result<(), CommandError> {
        if self.failing.contains(&handle.uri) {
            return Err(CommandError::Rejected {
                op,
                reason: "injected failure".into(),
            });
        }
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.log.push((handle.uri.clone(), cmd));
        let Some(state) = inner.handles.get_mut(&handle.id) else {
            return Err(CommandError::Released);
        };
        match cmd {
            MockCmd::Play(at) => {
                if state.started.is_none() {
                    state.started = Some(at);
                }
            }
            MockCmd::Pause | MockCmd::Stop => {
                state.base = state.position(now);
                state.started = None;
            }
            MockCmd::Seek(pos) => {
                state.base = pos;
                if state.started.is_some() {
                    state.started = Some(now);
                }
            }
            MockCmd::Volume(v) => state.volume = v,
        }
        Ok(())
    }
}

impl AudioBackend for MockBackend {
    type Handle = MockHandle;

    fn load(&self, uri: &str) -> Result<MockHandle, LoadError> {
        if let Some((open, cvar)) = &self.gate {
            let mut open = open.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
        }
        if !self.durations.contains_key(uri) {
            return Err(LoadError::Unreachable {
                uri: uri.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such stream"),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().unwrap().handles.insert(
            id,
            HandleState {
                uri: uri.to_string(),
                volume: 1.0,
                ..HandleState::default()
            },
        );
        Ok(MockHandle {
            id,
            uri: uri.to_string(),
        })
    }

    fn play(&self, handle: &MockHandle, start_at: Instant) -> Result<(), CommandError> {
        self.command(handle, "play", MockCmd::Play(start_at))
    }

    fn pause(&self, handle: &MockHandle) -> Result<(), CommandError> {
        self.command(handle, "pause", MockCmd::Pause)
    }

    fn stop(&self, handle: &MockHandle) -> Result<(), CommandError> {
        self.command(handle, "stop", MockCmd::Stop)
    }

    fn seek(&self, handle: &MockHandle, position: Duration) -> Result<(), CommandError> {
        self.command(handle, "seek", MockCmd::Seek(position))
    }

    fn set_volume(&self, handle: &MockHandle, volume: f32) -> Result<(), CommandError> {
        self.command(handle, "set volume", MockCmd::Volume(volume))
    }

    fn duration(&self, handle: &MockHandle) -> Option<Duration> {
        self.durations.get(&handle.uri).copied().flatten()
    }

    fn position(&self, handle: &MockHandle) -> Duration {
        let now = Instant::now();
        self.inner
            .lock()
            .unwrap()
            .handles
            .get(&handle.id)
            .map_or(Duration::ZERO, |h| h.position(now))
    }

    fn unload(&self, handle: MockHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.handles.remove(&handle.id);
        inner.released.push(handle.uri);
    }
}
