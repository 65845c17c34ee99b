use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{MultitrackPlayer, TransportCmd};
use crate::config;
use crate::ui;

/// What a key press asks for.
#[derive(Debug)]
pub enum KeyAction {
    Quit,
    Send(TransportCmd),
    SelectNext,
    SelectPrev,
    Ignore,
}

/// Map a key to an action on the selected track or the whole song.
pub fn action_for(
    code: KeyCode,
    controls: &config::ControlsSettings,
    selected: usize,
) -> KeyAction {
    let seek = controls.seek_seconds.min(i64::MAX as u64) as i64;
    match code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char(' ') | KeyCode::Char('p') => KeyAction::Send(TransportCmd::PlayPause),
        KeyCode::Char('s') => KeyAction::Send(TransportCmd::Stop),
        KeyCode::Char('j') | KeyCode::Down => KeyAction::SelectNext,
        KeyCode::Char('k') | KeyCode::Up => KeyAction::SelectPrev,
        KeyCode::Char('h') => KeyAction::Send(TransportCmd::NudgeVolume {
            index: selected,
            delta: -controls.volume_step,
        }),
        KeyCode::Char('l') => KeyAction::Send(TransportCmd::NudgeVolume {
            index: selected,
            delta: controls.volume_step,
        }),
        KeyCode::Char('m') => KeyAction::Send(TransportCmd::ToggleMute(selected)),
        KeyCode::Char('S') => KeyAction::Send(TransportCmd::ToggleSolo(selected)),
        KeyCode::Char('H') => KeyAction::Send(TransportCmd::SeekBy(-seek)),
        KeyCode::Char('L') => KeyAction::Send(TransportCmd::SeekBy(seek)),
        _ => KeyAction::Ignore,
    }
}

/// Main terminal event loop: draws the latest status and forwards key
/// presses to the control thread. Returns `Ok(())` when shutdown is
/// requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    player: &MultitrackPlayer,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let status = app.status();
        let track_count = status.transport.tracks.len();
        app.clamp_selection(track_count);

        terminal.draw(|f| ui::draw(f, app, &status, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, player, track_count) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    player: &MultitrackPlayer,
    track_count: usize,
) -> bool {
    match action_for(key.code, &settings.controls, app.selected) {
        KeyAction::Quit => return true,
        KeyAction::Send(cmd) => {
            let _ = player.send(cmd);
        }
        KeyAction::SelectNext => app.next(track_count),
        KeyAction::SelectPrev => app.prev(track_count),
        KeyAction::Ignore => {}
    }
    false
}
