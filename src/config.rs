//! Settings for the transport, key steps, song scanning and logging.
//!
//! `schema` holds the serde types and their defaults; `load` layers the
//! optional TOML file and `STEMDECK__*` environment variables on top.

mod load;
mod schema;

pub use schema::*;
