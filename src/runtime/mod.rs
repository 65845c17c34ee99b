use std::env;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::{MultitrackPlayer, TransportCmd};

mod event_loop;
mod logging;
mod settings;
mod startup;


pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();

    match logging::init(&settings.logging) {
        Ok(path) => info!(log = %path.display(), "stemdeck starting"),
        Err(e) => eprintln!("stemdeck: cannot open log file, logging disabled: {e}"),
    }
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let source = startup::parse_args(&args)?;
    let song = startup::resolve_song(&source, &settings.library)?;
    info!(%source, id = %song.id, tracks = song.tracks.len(), "song resolved");

    let player = MultitrackPlayer::new(startup::transport_options(&settings));
    let mut app = App::new();
    app.set_source(source.to_string());
    app.set_status_handle(player.status_handle());

    // If the control thread is gone (no output device) the status says why.
    let _ = player.send(TransportCmd::Load(song));

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &player);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    player.quit();
    info!("stemdeck exiting");

    run_result
}
