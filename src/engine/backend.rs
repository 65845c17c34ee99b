use std::time::{Duration, Instant};

use super::error::{CommandError, LoadError};

/// Capability set of the audio subsystem that actually decodes and plays
/// streams. The engine never touches samples; it only drives handles.
///
/// Implementations must tolerate being called from several threads at once:
/// the transport fans one command out to every track concurrently.
pub trait AudioBackend: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Open the stream behind `uri`. May block on I/O.
    fn load(&self, uri: &str) -> Result<Self::Handle, LoadError>;

    /// Start (or resume) playback so that audio begins at `start_at`.
    fn play(&self, handle: &Self::Handle, start_at: Instant) -> Result<(), CommandError>;

    fn pause(&self, handle: &Self::Handle) -> Result<(), CommandError>;

    fn stop(&self, handle: &Self::Handle) -> Result<(), CommandError>;

    fn seek(&self, handle: &Self::Handle, position: Duration) -> Result<(), CommandError>;

    /// Output level in `0.0..=1.0`.
    fn set_volume(&self, handle: &Self::Handle, volume: f32) -> Result<(), CommandError>;

    /// Total length of the stream, when the container reports one.
    fn duration(&self, handle: &Self::Handle) -> Option<Duration>;

    /// Current playback position as reported by the subsystem.
    fn position(&self, handle: &Self::Handle) -> Duration;

    /// Release the handle. Taking it by value makes a second release impossible.
    fn unload(&self, handle: Self::Handle);
}
