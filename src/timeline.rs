use std::path::PathBuf;

use crate::{
    allocate::allocate,
    config::TimelineConfig,
    error::{MontageError, MontageResult},
    geometry::{plan_placement, resolve_canvas, Canvas, FitMode, LayerRect},
    media::{MediaItem, MediaKind},
    schedule::schedule,
};

const SUM_TOLERANCE: f64 = 1e-6;

/// One item's fully resolved placement, duration, and transition parameters
/// within the output timeline.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Segment {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
    pub fit: FitMode,
    pub foreground: LayerRect,
    pub background: Option<LayerRect>,
    pub fade_in: f64,
    pub fade_out: f64,
    /// Allocated past the source's base duration; the backend holds the last
    /// frame when playback outlasts the source.
    pub stretched: bool,
    /// Native duration of a video source, when known.
    pub source_duration: Option<f64>,
}

/// The finalized plan handed to the rendering backend. Validated once at
/// construction and read-only afterwards.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Timeline {
    pub canvas: Canvas,
    pub fps: u32,
    pub target_seconds: f64,
    /// Background blur radius for Contain segments, applied by the backend.
    pub bg_blur: f64,
    pub segments: Vec<Segment>,
}

/// Build and validate the full timeline for the given items and config.
///
/// Pure and deterministic: identical inputs always produce an identical
/// plan. Fails fast on empty input, invalid config, degenerate allocation,
/// or an internal invariant violation.
#[tracing::instrument(skip(items, cfg), fields(items = items.len()))]
pub fn build_timeline(items: &[MediaItem], cfg: &TimelineConfig) -> MontageResult<Timeline> {
    cfg.validate()?;
    if items.is_empty() {
        return Err(MontageError::EmptyInput);
    }

    let canvas = resolve_canvas(cfg.resolution, items, cfg.preserve_videos);
    let budgets = allocate(items, cfg)?;
    let durations: Vec<f64> = budgets.iter().map(|b| b.seconds).collect();
    let slots = schedule(&durations, cfg.transition, cfg.fade_max_ratio);

    let segments = budgets
        .iter()
        .zip(&slots)
        .map(|(budget, slot)| {
            let item = &items[budget.item];
            let placement = plan_placement(item, canvas, cfg.bg_blur);
            Segment {
                path: item.path.clone(),
                kind: item.kind,
                duration: budget.seconds,
                start: slot.start,
                end: slot.end,
                fit: placement.fit,
                foreground: placement.foreground,
                background: placement.background,
                fade_in: slot.fade_in,
                fade_out: slot.fade_out,
                stretched: budget.stretched,
                source_duration: item.native_duration,
            }
        })
        .collect();

    let timeline = Timeline {
        canvas,
        fps: cfg.fps,
        target_seconds: cfg.duration,
        bg_blur: cfg.bg_blur,
        segments,
    };
    timeline.validate()?;
    tracing::debug!(
        segments = timeline.segments.len(),
        canvas_w = canvas.width,
        canvas_h = canvas.height,
        "timeline assembled"
    );
    Ok(timeline)
}

impl Timeline {
    pub fn total_seconds(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Check the global invariants. A violation is a logic defect, not an
    /// input condition; callers must abort rather than emit the plan.
    pub fn validate(&self) -> MontageResult<()> {
        if self.segments.is_empty() {
            return Err(MontageError::invariant("timeline has no segments"));
        }

        let total = self.total_seconds();
        if (total - self.target_seconds).abs() > SUM_TOLERANCE {
            return Err(MontageError::invariant(format!(
                "total duration {total:.7}s differs from target {:.7}s",
                self.target_seconds
            )));
        }

        let mut clock = 0.0;
        for (i, seg) in self.segments.iter().enumerate() {
            if !(seg.duration > 0.0) {
                return Err(MontageError::invariant(format!(
                    "segment {i} has non-positive duration {}",
                    seg.duration
                )));
            }
            if (seg.start - clock).abs() > SUM_TOLERANCE {
                return Err(MontageError::invariant(format!(
                    "segment {i} starts at {:.7}, expected {clock:.7}",
                    seg.start
                )));
            }
            if (seg.end - seg.start - seg.duration).abs() > SUM_TOLERANCE {
                return Err(MontageError::invariant(format!(
                    "segment {i} start/end span differs from its duration"
                )));
            }
            clock = seg.end;

            if seg.fade_in < 0.0 || seg.fade_out < 0.0 {
                return Err(MontageError::invariant(format!(
                    "segment {i} has a negative fade"
                )));
            }
            if seg.fade_in > seg.duration || seg.fade_out > seg.duration {
                return Err(MontageError::invariant(format!(
                    "segment {i} fade exceeds its duration"
                )));
            }
            if seg.fade_in > 0.0
                && seg.fade_out > 0.0
                && (seg.fade_in > seg.duration / 2.0 + SUM_TOLERANCE
                    || seg.fade_out > seg.duration / 2.0 + SUM_TOLERANCE)
            {
                return Err(MontageError::invariant(format!(
                    "segment {i} fades overlap inside the segment"
                )));
            }
            if i + 1 < self.segments.len() {
                let next = &self.segments[i + 1];
                if (seg.fade_out - next.fade_in).abs() > SUM_TOLERANCE {
                    return Err(MontageError::invariant(format!(
                        "crossfade between segments {i} and {} is asymmetric",
                        i + 1
                    )));
                }
            } else if seg.fade_out != 0.0 {
                return Err(MontageError::invariant("last segment has a fade-out"));
            }
            if i == 0 && seg.fade_in != 0.0 {
                return Err(MontageError::invariant("first segment has a fade-in"));
            }

            self.check_rect(i, "foreground", &seg.foreground)?;
            if let Some(bg) = &seg.background {
                self.check_rect(i, "background", bg)?;
            }
        }

        Ok(())
    }

    fn check_rect(&self, index: usize, layer: &str, rect: &LayerRect) -> MontageResult<()> {
        if rect.width == 0
            || rect.height == 0
            || rect.x + rect.width > self.canvas.width
            || rect.y + rect.height > self.canvas.height
        {
            return Err(MontageError::invariant(format!(
                "segment {index} {layer} rect {}x{}+{}+{} exceeds canvas {}x{}",
                rect.width, rect.height, rect.x, rect.y, self.canvas.width, self.canvas.height
            )));
        }
        Ok(())
    }

    /// Human-readable projection of the plan for diagnostic tooling.
    pub fn summary_lines(&self) -> Vec<String> {
        let photos: Vec<&Segment> = self
            .segments
            .iter()
            .filter(|s| s.kind == MediaKind::Photo)
            .collect();
        let videos: Vec<&Segment> = self
            .segments
            .iter()
            .filter(|s| s.kind == MediaKind::Video)
            .collect();
        let contain = self
            .segments
            .iter()
            .filter(|s| s.fit == FitMode::Contain)
            .count();
        let cover = self.segments.len() - contain;
        let backgrounds = self
            .segments
            .iter()
            .filter(|s| s.background.is_some())
            .count();
        let stretched = self.segments.iter().filter(|s| s.stretched).count();

        let mean = |segs: &[&Segment]| -> f64 {
            if segs.is_empty() {
                0.0
            } else {
                segs.iter().map(|s| s.duration).sum::<f64>() / segs.len() as f64
            }
        };

        let mut lines = vec![
            format!(
                "Canvas: {}x{} @ {} fps",
                self.canvas.width, self.canvas.height, self.fps
            ),
            format!(
                "Segments: {} ({} photos, {} videos)",
                self.segments.len(),
                photos.len(),
                videos.len()
            ),
            format!(
                "Fit modes: contain={contain} cover={cover} (blurred backgrounds: {backgrounds})"
            ),
            format!(
                "Total: {:.3}s of target {:.3}s",
                self.total_seconds(),
                self.target_seconds
            ),
            format!(
                "Mean durations: photo {:.2}s, video {:.2}s",
                mean(&photos),
                mean(&videos)
            ),
        ];
        if stretched > 0 {
            lines.push(format!(
                "Stretched: {stretched} video(s) allocated past their source duration"
            ));
        }
        lines
    }
}
