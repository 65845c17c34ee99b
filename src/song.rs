//! Song descriptors and the places they come from.
//!
//! A song is resolved before the engine sees it: either picked by id out of a
//! JSON catalog or assembled from a directory of stem files.

mod catalog;
mod model;
mod scan;

pub use catalog::{SongCatalog, SongError};
pub use model::{Song, TrackDescriptor};
pub use scan::scan_stems;
