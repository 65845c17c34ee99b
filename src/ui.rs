//! UI rendering helpers for the terminal user interface.
//!
//! This module renders the transport, the per-track mixer and the controls
//! help using `ratatui`. It only reads a `PlayerStatus` snapshot.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::App;
use crate::audio::PlayerStatus;
use crate::config::{ControlsSettings, UiSettings};
use crate::engine::{TrackView, TransportState};

const VOLUME_BAR_WIDTH: usize = 10;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "select track");
    map.insert("space/p", "play/pause");
    map.insert("s", "stop");
    // h/l and H/L are filled dynamically from config.
    map.insert("m", "mute");
    map.insert("S", "solo");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating the configured steps.
fn controls_text(controls: &ControlsSettings) -> String {
    let order = ["j/k", "space/p", "s", "h/l", "H/L", "m", "S", "q"];
    order
        .iter()
        .filter_map(|k| match *k {
            "h/l" => Some(format!(
                "[h/l] volume -/+{}%",
                (controls.volume_step * 100.0).round() as u32
            )),
            "H/L" => Some(format!("[H/L] seek -/+{}s", controls.seek_seconds)),
            _ => CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v)),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn state_label(status: &PlayerStatus) -> String {
    let t = &status.transport;
    match (t.state, t.loading) {
        (TransportState::Loading, Some((arrived, total))) => {
            format!("Loading {}/{}", arrived, total)
        }
        (TransportState::Idle, _) => "No song".to_string(),
        (TransportState::Ready, _) => "Stopped".to_string(),
        (TransportState::Playing, _) => "Playing".to_string(),
        (TransportState::Paused, _) => "Paused".to_string(),
        (state, _) => state.to_string(),
    }
}

/// `[######----]` for a level in `0.0..=1.0`.
fn volume_bar(volume: f32) -> String {
    let filled = (volume.clamp(0.0, 1.0) * VOLUME_BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(VOLUME_BAR_WIDTH - filled)
    )
}

fn track_row(track: &TrackView) -> String {
    format!(
        "{:<20} {} {:>3}%  {}{}  out {:>3}%",
        track.name,
        volume_bar(track.volume),
        (track.volume * 100.0).round() as u32,
        if track.is_muted { 'M' } else { '·' },
        if track.is_solo { 'S' } else { '·' },
        (track.effective_volume * 100.0).round() as u32,
    )
}

fn padded(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    status: &PlayerStatus,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" stemdeck ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let transport = &status.transport;
    let mut parts = vec![state_label(status)];
    if let Some(title) = &transport.title {
        parts.push(format!("Song: {}", title));
    }
    parts.push(format!("Tracks: {}", transport.tracks.len()));
    if let Some(source) = &app.source {
        parts.push(format!("From: {}", source));
    }
    let status_par = Paragraph::new(parts.join(" • "))
        .block(padded(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Position
    let ratio = if transport.duration.is_zero() {
        0.0
    } else {
        (transport.position.as_secs_f64() / transport.duration.as_secs_f64()).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" position "))
        .ratio(ratio)
        .label(format!(
            "{} / {}",
            format_mmss(transport.position),
            format_mmss(transport.duration)
        ));
    frame.render_widget(gauge, chunks[2]);

    // Mixer
    let items: Vec<ListItem> = transport
        .tracks
        .iter()
        .map(|t| {
            let item = ListItem::new(track_row(t));
            if t.effective_volume == 0.0 {
                item.dim()
            } else {
                item
            }
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" tracks "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !transport.tracks.is_empty() {
        state.select(Some(app.selected.min(transport.tracks.len() - 1)));
    }
    frame.render_stateful_widget(list, chunks[3], &mut state);

    let message = Paragraph::new(status.message.as_deref().unwrap_or(""))
        .block(padded(" messages "))
        .wrap(Wrap { trim: true });
    frame.render_widget(message, chunks[4]);

    let footer = Paragraph::new(controls_text(controls_settings))
        .block(padded(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[5]);
}
