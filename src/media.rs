use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Kind of a scanned media file. New kinds must be handled exhaustively in
/// the allocator and the geometry resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

/// One scanned input file. Produced once by the scanner and never mutated;
/// the timeline engine treats `path` as an opaque handle.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Pixel dimensions of the source frame.
    pub width: u32,
    pub height: u32,
    /// Native duration in seconds. Videos only; `None` when probing failed.
    pub native_duration: Option<f64>,
    /// Capture timestamp, used only for ordering.
    pub captured_at: DateTime<Local>,
}

impl MediaItem {
    pub fn is_portrait(&self) -> bool {
        // Square sources count as landscape.
        self.height > self.width
    }
}
