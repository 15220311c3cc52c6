#![forbid(unsafe_code)]

pub mod allocate;
pub mod config;
pub mod error;
pub mod geometry;
pub mod media;
pub mod render;
pub mod scan;
pub mod schedule;
pub mod timeline;

pub use allocate::{allocate, ClipBudget, MIN_CLIP_SECONDS};
pub use config::{load_config_file, resolve_config, ConfigOverlay, TimelineConfig, PRESET_NAMES};
pub use error::{MontageError, MontageResult};
pub use geometry::{plan_placement, resolve_canvas, Canvas, FitMode, LayerRect, Placement};
pub use media::{MediaItem, MediaKind};
pub use render::{FfmpegBackend, RenderBackend, RenderOptions};
pub use scan::{scan_media, ScanReport};
pub use timeline::{build_timeline, Segment, Timeline};
