//! Media item descriptor

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The media item currently selected in a room.
///
/// The playback core never looks inside it; it is swapped as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieInfo {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    /// Live streams have no meaningful seek position
    #[serde(default)]
    pub live: bool,
    /// Serve the media through the server instead of directly
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub creator_id: Option<Uuid>,
    /// Extra request headers for fetching the media
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl MovieInfo {
    pub fn new(name: String, url: String) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            url,
            name,
            ..Self::default()
        }
    }

    pub fn with_live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }
}
