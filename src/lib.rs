//! stemdeck: play the stems of one song in lockstep from the terminal.

pub mod app;
pub mod audio;
pub mod config;
pub mod engine;
pub mod runtime;
pub mod song;
pub mod ui;
