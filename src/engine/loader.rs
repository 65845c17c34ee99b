//! Concurrent loading of a song's tracks.
//!
//! One thread per descriptor opens its stream and reports back on a channel.
//! Nothing owns a handle outside a `Track`, and every `Track` either reaches
//! the transport or is unloaded on the way.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SendError, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::song::TrackDescriptor;

use super::backend::AudioBackend;
use super::error::LoadError;
use super::track::Track;

type LoadResult<H> = Result<Track<H>, LoadError>;

pub(super) struct LoadJob<H> {
    rx: Receiver<(usize, LoadResult<H>)>,
    names: Vec<String>,
    uris: Vec<String>,
    slots: Vec<Option<LoadResult<H>>>,
    received: usize,
    workers: Vec<JoinHandle<()>>,
}

impl<H: Send + Sync + 'static> LoadJob<H> {
    pub(super) fn spawn<B>(backend: Arc<B>, descriptors: &[TrackDescriptor]) -> Self
    where
        B: AudioBackend<Handle = H>,
    {
        let (tx, rx) = mpsc::channel();
        let mut workers = Vec::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().cloned().enumerate() {
            let tx = tx.clone();
            let backend = backend.clone();
            workers.push(thread::spawn(move || {
                let result = Track::load(backend.as_ref(), &descriptor);
                // The receiver only goes away after every sender is dropped,
                // so a failed send means the song was dropped without a reaper.
                if let Err(SendError((_, Ok(mut track)))) = tx.send((index, result)) {
                    track.unload(backend.as_ref());
                }
            }));
        }

        Self {
            rx,
            names: descriptors.iter().map(|d| d.name.clone()).collect(),
            uris: descriptors.iter().map(|d| d.url.clone()).collect(),
            slots: descriptors.iter().map(|_| None).collect(),
            received: 0,
            workers,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn received(&self) -> usize {
        self.received
    }

    pub(super) fn is_complete(&self) -> bool {
        self.received >= self.slots.len()
    }

    /// Collect whatever has arrived without blocking.
    pub(super) fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok((index, result)) => self.store(index, result),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.abandon_missing();
                    break;
                }
            }
        }
    }

    /// Block until every loader has reported.
    pub(super) fn wait(&mut self) {
        while !self.is_complete() {
            match self.rx.recv() {
                Ok((index, result)) => self.store(index, result),
                Err(_) => {
                    self.abandon_missing();
                    break;
                }
            }
        }
    }

    fn store(&mut self, index: usize, result: LoadResult<H>) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.is_none() {
                self.received += 1;
            }
            *slot = Some(result);
        }
    }

    // A worker that panicked never sends; give its slot an error.
    fn abandon_missing(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                warn!(track = %self.names[i], "loader exited without reporting");
                *slot = Some(Err(LoadError::Abandoned(self.uris[i].clone())));
                self.received += 1;
            }
        }
    }

    /// Results in descriptor order, paired with the descriptor names.
    /// Call after the job is complete.
    pub(super) fn into_results(mut self) -> Vec<(String, LoadResult<H>)> {
        self.abandon_missing();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        self.names
            .into_iter()
            .zip(self.slots)
            .map(|(name, slot)| {
                let result = slot.unwrap_or_else(|| Err(LoadError::Abandoned(name.clone())));
                (name, result)
            })
            .collect()
    }

    /// Abort the job. Tracks that already arrived are unloaded now; the rest
    /// are unloaded by a reaper thread as their loaders finish. Returns the
    /// number released synchronously and the reaper.
    pub(super) fn cancel<B>(self, backend: Arc<B>) -> (usize, JoinHandle<()>)
    where
        B: AudioBackend<Handle = H>,
    {
        let LoadJob {
            rx, slots, workers, ..
        } = self;

        let mut released = 0;
        for slot in slots.into_iter().flatten() {
            if let Ok(mut track) = slot {
                if track.unload(backend.as_ref()) {
                    released += 1;
                }
            }
        }

        let reaper = thread::spawn(move || {
            for (_, result) in rx {
                if let Ok(mut track) = result {
                    debug!(track = track.name(), "releasing track loaded after teardown");
                    track.unload(backend.as_ref());
                }
            }
            for worker in workers {
                let _ = worker.join();
            }
        });

        (released, reaper)
    }
}
