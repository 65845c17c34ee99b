//! Audio subsystem: the rodio backend and the control thread.
//!
//! The control thread owns the output stream and the `Transport`. The UI
//! talks to it through `TransportCmd`s and reads back a `PlayerStatus`.

mod player;
mod sink;
mod thread;
mod types;

pub use player::MultitrackPlayer;
pub use sink::{RodioBackend, RodioTrack};
pub use types::{PlayerStatus, StatusHandle, TransportCmd};

#[cfg(test)]
mod tests;
