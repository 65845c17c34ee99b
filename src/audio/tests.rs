use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rodio::mixer::{MixerSource, mixer};

use super::sink::{RodioBackend, resolve_path};
use super::thread::run_control_loop;
use super::types::{PlayerStatus, StatusHandle, TransportCmd};
use crate::engine::mock::MockBackend;
use crate::engine::{DurationPolicy, LoadError, Transport, TransportOptions, TransportState};
use crate::song::{Song, TrackDescriptor};

const RATE: u32 = 8_000;

fn song(uris: &[&str]) -> Song {
    Song {
        id: "s".into(),
        title: "Song".into(),
        tracks: uris
            .iter()
            .map(|u| TrackDescriptor::new(u.trim_end_matches(".wav"), *u))
            .collect(),
    }
}

fn wait_for(status: &StatusHandle, what: impl Fn(&PlayerStatus) -> bool) -> PlayerStatus {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = status.lock().unwrap().clone();
        if what(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "timed out, last status: {snapshot:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn resolve_path_accepts_plain_paths_and_file_urls() {
    assert_eq!(
        resolve_path("/music/bass.wav").unwrap(),
        std::path::PathBuf::from("/music/bass.wav")
    );
    assert_eq!(
        resolve_path("file:///music/bass.wav").unwrap(),
        std::path::PathBuf::from("/music/bass.wav")
    );
    assert!(matches!(
        resolve_path("https://example.com/bass.mp3"),
        Err(LoadError::Unsupported(_))
    ));
}

#[test]
fn control_loop_loads_plays_and_quits() {
    let backend = Arc::new(
        MockBackend::new()
            .with_track("drums.wav", 10_000)
            .with_track("bass.wav", 10_000),
    );
    let transport = Transport::with_shared(backend.clone(), TransportOptions::default());
    let status: StatusHandle = Arc::new(Mutex::new(PlayerStatus::default()));
    let (tx, rx) = mpsc::channel();

    let loop_status = status.clone();
    let control = thread::spawn(move || run_control_loop(transport, rx, loop_status));

    tx.send(TransportCmd::Load(song(&["drums.wav", "bass.wav"])))
        .unwrap();
    let ready = wait_for(&status, |s| s.transport.state == TransportState::Ready);
    assert_eq!(ready.transport.tracks.len(), 2);
    assert_eq!(ready.transport.duration, Duration::from_millis(10_000));
    assert!(ready.message.is_none());

    tx.send(TransportCmd::PlayPause).unwrap();
    wait_for(&status, |s| s.transport.state == TransportState::Playing);

    tx.send(TransportCmd::ToggleSolo(1)).unwrap();
    let soloed = wait_for(&status, |s| s.transport.tracks[1].is_solo);
    assert_eq!(soloed.transport.tracks[0].effective_volume, 0.0);

    tx.send(TransportCmd::Quit).unwrap();
    control.join().unwrap();

    assert_eq!(backend.released(), vec!["bass.wav", "drums.wav"]);
    let last = status.lock().unwrap().clone();
    assert_eq!(last.transport.state, TransportState::Released);
}

#[test]
fn control_loop_rejects_commands_while_loading() {
    let backend = Arc::new(MockBackend::new().with_track("a.wav", 1_000).gated());
    let transport = Transport::with_shared(backend.clone(), TransportOptions::default());
    let status: StatusHandle = Arc::new(Mutex::new(PlayerStatus::default()));
    let (tx, rx) = mpsc::channel();

    let loop_status = status.clone();
    let control = thread::spawn(move || run_control_loop(transport, rx, loop_status));

    tx.send(TransportCmd::Load(song(&["a.wav"]))).unwrap();
    wait_for(&status, |s| s.transport.state == TransportState::Loading);

    tx.send(TransportCmd::Play).unwrap();
    let busy = wait_for(&status, |s| s.message.is_some());
    assert_eq!(busy.transport.state, TransportState::Loading);
    assert!(busy.message.unwrap().contains("loading"));

    backend.open_gate();
    wait_for(&status, |s| s.transport.state == TransportState::Ready);

    drop(tx);
    control.join().unwrap();
    assert_eq!(backend.live_handles(), 0);
}

#[test]
fn control_loop_reports_partial_loads() {
    let backend = Arc::new(MockBackend::new().with_track("a.wav", 1_000));
    let transport = Transport::with_shared(backend.clone(), TransportOptions::default());
    let status: StatusHandle = Arc::new(Mutex::new(PlayerStatus::default()));
    let (tx, rx) = mpsc::channel();

    let loop_status = status.clone();
    let control = thread::spawn(move || run_control_loop(transport, rx, loop_status));

    tx.send(TransportCmd::Load(song(&["a.wav", "missing.wav"])))
        .unwrap();
    let ready = wait_for(&status, |s| s.transport.state == TransportState::Ready);
    let message = ready.message.unwrap();
    assert!(message.contains("loaded 1 of 2"), "{message}");
    assert!(message.contains("missing"), "{message}");

    tx.send(TransportCmd::NudgeVolume {
        index: 0,
        delta: -0.25,
    })
    .unwrap();
    let nudged = wait_for(&status, |s| s.transport.tracks[0].volume < 1.0);
    assert!((nudged.transport.tracks[0].volume - 0.75).abs() < 1e-6);

    tx.send(TransportCmd::Quit).unwrap();
    control.join().unwrap();
}

#[test]
fn control_loop_close_returns_to_idle_and_loads_again() {
    let backend = Arc::new(
        MockBackend::new()
            .with_track("a.wav", 1_000)
            .with_track("b.wav", 2_000),
    );
    let transport = Transport::with_shared(backend.clone(), TransportOptions::default());
    let status: StatusHandle = Arc::new(Mutex::new(PlayerStatus::default()));
    let (tx, rx) = mpsc::channel();

    let loop_status = status.clone();
    let control = thread::spawn(move || run_control_loop(transport, rx, loop_status));

    tx.send(TransportCmd::Load(song(&["a.wav"]))).unwrap();
    wait_for(&status, |s| s.transport.state == TransportState::Ready);

    tx.send(TransportCmd::Close).unwrap();
    let idle = wait_for(&status, |s| s.transport.state == TransportState::Idle);
    assert!(idle.transport.tracks.is_empty());
    assert_eq!(idle.transport.title, None);
    assert_eq!(backend.live_handles(), 0);

    tx.send(TransportCmd::Load(song(&["b.wav"]))).unwrap();
    let ready = wait_for(&status, |s| s.transport.state == TransportState::Ready);
    assert_eq!(ready.transport.duration, Duration::from_millis(2_000));
    assert!(ready.message.is_none());

    tx.send(TransportCmd::Quit).unwrap();
    control.join().unwrap();
    assert_eq!(backend.released(), vec!["a.wav", "b.wav"]);
}

// --- rodio backend, driven through a headless mixer ---

/// Mono 16-bit PCM square wave at half scale, `millis` long.
fn write_tone(path: &Path, millis: u32) {
    let frames = RATE * millis / 1_000;
    let data_len = frames * 2;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&RATE.to_le_bytes());
    bytes.extend_from_slice(&(RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames {
        let sample: i16 = if (i / 8) % 2 == 0 { 16_384 } else { -16_384 };
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    fs::write(path, bytes).unwrap();
}

/// Render `n` samples the way an output device would pull them.
fn pull(out: &mut MixerSource, n: usize) -> Vec<f32> {
    (0..n).map(|_| out.next().unwrap_or(0.0)).collect()
}

fn audible(samples: &[f32]) -> usize {
    samples.iter().filter(|s| s.abs() > 0.01).count()
}

fn rodio_options() -> TransportOptions {
    TransportOptions {
        start_buffer: Duration::from_millis(5),
        tick: Duration::from_millis(5),
        resync: Duration::from_millis(30),
        duration_policy: DurationPolicy::First,
    }
}

fn tone_song(dir: &Path, millis: u32) -> Song {
    let path = dir.join("tone.wav");
    write_tone(&path, millis);
    Song {
        id: "tone".into(),
        title: "Tone".into(),
        tracks: vec![TrackDescriptor::new("tone", path.to_string_lossy())],
    }
}

#[test]
fn rodio_tracks_play_and_replay_after_the_song_ends() {
    let dir = tempfile::tempdir().unwrap();
    let (mixer, mut out) = mixer(1, RATE);
    let mut t = Transport::new(RodioBackend::new(&mixer), rodio_options());

    let report = t.load(&tone_song(dir.path(), 200)).unwrap();
    assert_eq!(report.loaded, 1);
    let length = t.duration().as_millis();
    assert!((195..=205).contains(&length), "duration {length}ms");

    // Loaded tracks wait paused.
    assert_eq!(audible(&pull(&mut out, 400)), 0);

    let outcome = t.play().unwrap();
    assert!(outcome.failures.is_empty(), "{outcome:?}");
    let first = audible(&pull(&mut out, 800));
    assert!(first > 700, "first pass audible samples: {first}");
    let position = t.track_positions()[0];
    assert!(
        position >= Duration::from_millis(80) && position <= Duration::from_millis(105),
        "{position:?}"
    );

    // Run past the end of the file; the sink drops the finished source.
    pull(&mut out, 2_000);

    let outcome = t.stop().unwrap();
    assert!(outcome.failures.is_empty(), "{outcome:?}");
    assert_eq!(t.track_positions(), vec![Duration::ZERO]);
    assert_eq!(audible(&pull(&mut out, 200)), 0);

    let outcome = t.play().unwrap();
    assert!(outcome.failures.is_empty(), "{outcome:?}");
    let replay = audible(&pull(&mut out, 800));
    assert!(replay > 700, "replay audible samples: {replay}");
}

#[test]
fn rodio_seek_keeps_the_track_volume() {
    let dir = tempfile::tempdir().unwrap();
    let (mixer, mut out) = mixer(1, RATE);
    let mut t = Transport::new(RodioBackend::new(&mixer), rodio_options());
    t.load(&tone_song(dir.path(), 200)).unwrap();

    t.set_track_volume(0, 0.5).unwrap();
    let outcome = t.seek(Duration::from_millis(150)).unwrap();
    assert!(outcome.failures.is_empty(), "{outcome:?}");
    assert_eq!(t.track_positions(), vec![Duration::from_millis(150)]);

    t.play().unwrap();
    let samples = pull(&mut out, 800);
    // 50ms of tone left: 400 samples at 8kHz.
    let heard = audible(&samples);
    assert!((300..=500).contains(&heard), "audible samples after seek: {heard}");
    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    assert!((peak - 0.25).abs() < 0.02, "peak {peak}");
}

#[test]
fn rodio_mute_silences_a_playing_track() {
    let dir = tempfile::tempdir().unwrap();
    let (mixer, mut out) = mixer(1, RATE);
    let mut t = Transport::new(RodioBackend::new(&mixer), rodio_options());
    t.load(&tone_song(dir.path(), 500)).unwrap();

    t.play().unwrap();
    assert!(audible(&pull(&mut out, 400)) > 300);

    t.toggle_mute(0).unwrap();
    // Sink controls apply every 5ms of output.
    pull(&mut out, 80);
    assert_eq!(audible(&pull(&mut out, 400)), 0);

    t.toggle_mute(0).unwrap();
    pull(&mut out, 80);
    assert!(audible(&pull(&mut out, 400)) > 300);
}
