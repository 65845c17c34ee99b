//! Application module: the view model shared by the TUI and the runtime.
//!
//! `App` lives in `app::model` and holds the cursor over the current song's
//! tracks plus the handle used to read the control thread's status.

mod model;

pub use model::*;
