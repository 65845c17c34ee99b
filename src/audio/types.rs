//! Commands and shared handles of the control thread.

use std::sync::{Arc, Mutex};

use crate::engine::TransportSnapshot;
use crate::song::Song;

#[derive(Debug)]
pub enum TransportCmd {
    /// Open a song, replacing the current one.
    Load(Song),
    Play,
    Pause,
    /// Play when ready or paused, pause when playing.
    PlayPause,
    Stop,
    /// Seek relative to the current position, in seconds.
    SeekBy(i64),
    SetVolume { index: usize, volume: f32 },
    /// Change a track's volume relative to its current value.
    NudgeVolume { index: usize, delta: f32 },
    ToggleMute(usize),
    ToggleSolo(usize),
    /// Close the current song, cancelling a pending load. The player goes
    /// back to idle and accepts another `Load`.
    Close,
    /// Release everything and end the control thread.
    Quit,
}

/// What the UI reads: the transport snapshot plus the last message worth
/// showing (errors, partial loads).
#[derive(Debug, Clone, Default)]
pub struct PlayerStatus {
    pub transport: TransportSnapshot,
    pub message: Option<String>,
}

pub type StatusHandle = Arc<Mutex<PlayerStatus>>;
