use crate::media::{MediaItem, MediaKind};

pub const DEFAULT_CANVAS: Canvas = Canvas {
    width: 1280,
    height: 720,
};

/// Output canvas in pixels. Resolved once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn is_portrait(self) -> bool {
        // Square canvases count as landscape.
        self.height > self.width
    }
}

/// How a source frame is fitted onto the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Scale to the largest size that fits inside the canvas without
    /// cropping; empty space is filled by a background layer.
    Contain,
    /// Scale to the smallest size that fully covers the canvas, then
    /// center-crop the overflow.
    Cover,
}

/// Placement of one scaled layer on the canvas. `x..x+width` and
/// `y..y+height` always lie within the canvas; `crop_x`/`crop_y` are the
/// symmetric crop offsets in scaled-source space (nonzero only for Cover).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerRect {
    pub scale: f64,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
}

/// Resolved placement for one item: foreground fit plus an optional blurred
/// background fill.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub fit: FitMode,
    pub foreground: LayerRect,
    pub background: Option<LayerRect>,
}

/// Decide the output canvas: explicit config wins; under preserve-videos the
/// canvas spans the maximum width and maximum height observed across video
/// items (independently, so it may match no single source); otherwise a
/// fixed default.
pub fn resolve_canvas(
    explicit: Option<(u32, u32)>,
    items: &[MediaItem],
    preserve_videos: bool,
) -> Canvas {
    if let Some((width, height)) = explicit {
        return Canvas { width, height };
    }
    if preserve_videos {
        let videos = items.iter().filter(|it| it.kind == MediaKind::Video);
        let (mut w, mut h) = (0u32, 0u32);
        for v in videos {
            w = w.max(v.width);
            h = h.max(v.height);
        }
        if w > 0 && h > 0 {
            // Encoder-friendly even dimensions.
            return Canvas {
                width: (w & !1).max(2),
                height: (h & !1).max(2),
            };
        }
    }
    DEFAULT_CANVAS
}

pub fn contain(src_w: u32, src_h: u32, canvas: Canvas) -> LayerRect {
    let scale = f64::min(
        canvas.width as f64 / src_w as f64,
        canvas.height as f64 / src_h as f64,
    );
    let width = ((src_w as f64 * scale).round() as u32).min(canvas.width);
    let height = ((src_h as f64 * scale).round() as u32).min(canvas.height);
    LayerRect {
        scale,
        x: (canvas.width - width) / 2,
        y: (canvas.height - height) / 2,
        width,
        height,
        crop_x: 0,
        crop_y: 0,
    }
}

pub fn cover(src_w: u32, src_h: u32, canvas: Canvas) -> LayerRect {
    let scale = f64::max(
        canvas.width as f64 / src_w as f64,
        canvas.height as f64 / src_h as f64,
    );
    let scaled_w = ((src_w as f64 * scale).round() as u32).max(canvas.width);
    let scaled_h = ((src_h as f64 * scale).round() as u32).max(canvas.height);
    LayerRect {
        scale,
        x: 0,
        y: 0,
        width: canvas.width,
        height: canvas.height,
        crop_x: (scaled_w - canvas.width) / 2,
        crop_y: (scaled_h - canvas.height) / 2,
    }
}

/// Decide fit mode and layer rects for one item.
///
/// Photos always prefer Contain; videos prefer Contain only when the canvas
/// or the source is portrait. A Contain preference with blur disabled
/// degrades to Cover: without a background layer the foreground itself must
/// fill the canvas.
pub fn plan_placement(item: &MediaItem, canvas: Canvas, bg_blur: f64) -> Placement {
    let prefers_contain = match item.kind {
        MediaKind::Photo => true,
        MediaKind::Video => canvas.is_portrait() || item.is_portrait(),
    };

    if prefers_contain && bg_blur > 0.0 {
        Placement {
            fit: FitMode::Contain,
            foreground: contain(item.width, item.height, canvas),
            background: Some(cover(item.width, item.height, canvas)),
        }
    } else {
        Placement {
            fit: FitMode::Cover,
            foreground: cover(item.width, item.height, canvas),
            background: None,
        }
    }
}
