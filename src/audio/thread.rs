use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::OutputStreamBuilder;
use tracing::{error, info, warn};

use crate::engine::{
    AudioBackend, EngineError, LoadReport, Outcome, Transport, TransportOptions, TransportState,
};

use super::sink::RodioBackend;
use super::types::{StatusHandle, TransportCmd};

/// Poll interval when nothing is ticking.
const IDLE_POLL: Duration = Duration::from_millis(200);
/// Poll interval while tracks are loading.
const LOAD_POLL: Duration = Duration::from_millis(20);

pub(super) fn spawn_control_thread(
    rx: Receiver<TransportCmd>,
    status: StatusHandle,
    options: TransportOptions,
) -> JoinHandle<()> {
    thread::spawn(move || {
        // The output stream must outlive every sink and stay on this thread.
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "no audio output device");
                if let Ok(mut s) = status.lock() {
                    s.message = Some(format!("no audio output device: {e}"));
                }
                return;
            }
        };
        // rodio logs to stderr when the stream is dropped; the terminal is ours.
        stream.log_on_drop(false);

        let transport = Transport::new(RodioBackend::new(stream.mixer()), options);
        run_control_loop(transport, rx, status);
    })
}

/// Execute commands against `transport` until `Quit` or until every sender
/// is gone. Between commands the pending load is polled and the clock ticked.
pub(crate) fn run_control_loop<B: AudioBackend>(
    mut transport: Transport<B>,
    rx: Receiver<TransportCmd>,
    status: StatusHandle,
) {
    let mut message: Option<String> = None;

    loop {
        let timeout = if transport.is_busy() {
            LOAD_POLL
        } else {
            transport
                .next_tick_in(Instant::now())
                .map_or(IDLE_POLL, |d| d.min(IDLE_POLL))
        };

        match rx.recv_timeout(timeout) {
            Ok(TransportCmd::Quit) | Err(RecvTimeoutError::Disconnected) => {
                transport.teardown();
                publish(&status, &transport, message.take());
                break;
            }
            Ok(cmd) => message = execute(&mut transport, cmd),
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(result) = transport.poll_load() {
            message = describe_load(result);
        }

        if transport.tick(Instant::now()) {
            info!("song finished");
        }

        publish(&status, &transport, message.clone());
    }

    transport.wait_released();
}

/// Run one command. Returns a message for the UI when there is something to
/// report.
fn execute<B: AudioBackend>(transport: &mut Transport<B>, cmd: TransportCmd) -> Option<String> {
    // One operation at a time: nothing but a close may start while a load
    // is still joining.
    if transport.is_busy() && !matches!(cmd, TransportCmd::Close) {
        return Some(EngineError::Busy.to_string());
    }

    let result = match cmd {
        TransportCmd::Load(song) => {
            return transport.begin_load(&song).err().map(|e| e.to_string());
        }
        TransportCmd::Play => transport.play(),
        TransportCmd::Pause => transport.pause(),
        TransportCmd::PlayPause => match transport.state() {
            TransportState::Playing => transport.pause(),
            _ => transport.play(),
        },
        TransportCmd::Stop => transport.stop(),
        TransportCmd::SeekBy(secs) => {
            let current = transport.position();
            let delta = Duration::from_secs(secs.unsigned_abs());
            let target = if secs < 0 {
                current.saturating_sub(delta)
            } else {
                current + delta
            };
            transport.seek(target)
        }
        TransportCmd::SetVolume { index, volume } => transport.set_track_volume(index, volume),
        TransportCmd::NudgeVolume { index, delta } => {
            match transport.tracks().get(index).map(|t| t.volume) {
                Some(volume) => transport.set_track_volume(index, volume + delta),
                None => Err(EngineError::TrackIndex(index)),
            }
        }
        TransportCmd::ToggleMute(index) => transport.toggle_mute(index),
        TransportCmd::ToggleSolo(index) => transport.toggle_solo(index),
        TransportCmd::Close => {
            transport.close();
            return None;
        }
        TransportCmd::Quit => return None,
    };

    match result {
        Ok(outcome) => describe_outcome(&outcome),
        Err(e) => {
            warn!(error = %e, "command rejected");
            Some(e.to_string())
        }
    }
}

fn describe_outcome(outcome: &Outcome) -> Option<String> {
    match outcome.failures.as_slice() {
        [] => None,
        [only] => Some(only.to_string()),
        [first, rest @ ..] => Some(format!("{first} (and {} more)", rest.len())),
    }
}

fn describe_load(result: Result<LoadReport, EngineError>) -> Option<String> {
    match result {
        Ok(report) if report.failures.is_empty() => None,
        Ok(report) => {
            let names: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
            Some(format!(
                "loaded {} of {} tracks, failed: {}",
                report.loaded,
                report.loaded + report.failures.len(),
                names.join(", ")
            ))
        }
        Err(e) => {
            error!(error = %e, "song failed to load");
            Some(e.to_string())
        }
    }
}

fn publish<B: AudioBackend>(
    status: &StatusHandle,
    transport: &Transport<B>,
    message: Option<String>,
) {
    if let Ok(mut s) = status.lock() {
        s.transport = transport.snapshot();
        s.message = message;
    }
}
