use serde::Deserialize;

/// One song as described on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub tracks: Vec<TrackDescriptor>,
}

/// Where to find one track of a song.
///
/// `volume` and `is_muted` are accepted for compatibility with existing
/// catalogs but only as hints: every track starts at full volume, unmuted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub is_muted: Option<bool>,
}

impl TrackDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            volume: None,
            is_muted: None,
        }
    }
}
