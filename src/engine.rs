//! Multitrack synchronization engine.
//!
//! A song is a set of independently loaded audio handles that must stay
//! phase-aligned. The `Transport` owns every `Track` of the current song and
//! issues play/pause/stop to all of them against one shared deadline, while
//! the mix policy derives each track's audible level from the volume, mute
//! and solo flags of the whole set.

mod backend;
mod clock;
mod error;
mod loader;
mod mix;
mod track;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::AudioBackend;
pub use clock::{DurationPolicy, PlaybackClock, Ticker};
pub use error::{CommandError, CommandFailure, EngineError, LoadError, LoadFailure};
pub use mix::{Level, SoloSession, Strip, recompute};
pub use track::{Track, TrackView};
pub use transport::{
    LoadReport, Outcome, Transport, TransportOptions, TransportSnapshot, TransportState,
};
