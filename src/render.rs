use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    error::{MontageError, MontageResult},
    media::MediaKind,
    timeline::{Segment, Timeline},
};

#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub out_path: PathBuf,
    pub overwrite: bool,
}

/// Capability seam between the deterministic planner and the
/// environment-dependent encoder. The backend receives a validated,
/// read-only plan and makes no further scheduling decisions.
pub trait RenderBackend {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    fn render(&self, timeline: &Timeline, opts: &RenderOptions) -> MontageResult<()>;
}

/// Renders by driving the system `ffmpeg` binary: one input per segment, a
/// filter chain realizing the planned geometry and fades, concat, H.264.
pub struct FfmpegBackend;

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> MontageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

impl RenderBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        is_ffmpeg_on_path()
    }

    fn render(&self, timeline: &Timeline, opts: &RenderOptions) -> MontageResult<()> {
        timeline.validate()?;
        if timeline.canvas.width % 2 != 0 || timeline.canvas.height % 2 != 0 {
            // yuv420p output requires even frame dimensions.
            return Err(MontageError::render(format!(
                "canvas {}x{} must have even dimensions",
                timeline.canvas.width, timeline.canvas.height
            )));
        }
        if !opts.overwrite && opts.out_path.exists() {
            return Err(MontageError::render(format!(
                "output file '{}' already exists",
                opts.out_path.display()
            )));
        }
        if !self.is_available() {
            return Err(MontageError::render(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        ensure_parent_dir(&opts.out_path)?;

        let args = build_ffmpeg_args(timeline, opts);
        tracing::debug!(inputs = timeline.segments.len(), "spawning ffmpeg");

        let output = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                MontageError::render(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MontageError::render(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Build the full ffmpeg argument list for a plan. Pure so tests can check
/// the argv without invoking ffmpeg.
pub fn build_ffmpeg_args(timeline: &Timeline, opts: &RenderOptions) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    args.push(if opts.overwrite { "-y" } else { "-n" }.to_string());
    args.extend(["-loglevel", "error"].map(String::from));

    for seg in &timeline.segments {
        match seg.kind {
            MediaKind::Photo => {
                args.extend(["-loop", "1", "-t"].map(String::from));
                args.push(format_secs(seg.duration));
            }
            MediaKind::Video => {}
        }
        args.push("-i".to_string());
        args.push(seg.path.to_string_lossy().into_owned());
    }

    let mut graph = String::new();
    for (i, seg) in timeline.segments.iter().enumerate() {
        segment_chain(&mut graph, timeline, seg, i);
    }
    for i in 0..timeline.segments.len() {
        graph.push_str(&format!("[seg{i}]"));
    }
    graph.push_str(&format!(
        "concat=n={}:v=1:a=0[vout]",
        timeline.segments.len()
    ));

    args.push("-filter_complex".to_string());
    args.push(graph);
    args.extend(["-map", "[vout]", "-an"].map(String::from));
    args.extend(
        [
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]
        .map(String::from),
    );
    args.push(opts.out_path.to_string_lossy().into_owned());
    args
}

/// Emit the filter chain realizing one segment's planned geometry:
/// scale/crop per the layer rects, optional blurred background underlay,
/// exact trim to the allocated duration, fades inside it.
fn segment_chain(graph: &mut String, timeline: &Timeline, seg: &Segment, index: usize) {
    let fg = &seg.foreground;
    let fg_label = format!("fg{index}");

    graph.push_str(&format!("[{index}:v]"));
    if fg.crop_x > 0 || fg.crop_y > 0 {
        let scaled_w = fg.width + 2 * fg.crop_x;
        let scaled_h = fg.height + 2 * fg.crop_y;
        graph.push_str(&format!(
            "scale={scaled_w}:{scaled_h},crop={}:{}:{}:{}",
            fg.width, fg.height, fg.crop_x, fg.crop_y
        ));
    } else {
        graph.push_str(&format!("scale={}:{}", fg.width, fg.height));
    }
    graph.push_str(&format!(",setsar=1[{fg_label}];"));

    let composed = match &seg.background {
        Some(bg) => {
            let scaled_w = bg.width + 2 * bg.crop_x;
            let scaled_h = bg.height + 2 * bg.crop_y;
            graph.push_str(&format!(
                "[{index}:v]scale={scaled_w}:{scaled_h},crop={}:{}:{}:{},setsar=1,boxblur={}[bg{index}];",
                bg.width, bg.height, bg.crop_x, bg.crop_y, timeline.bg_blur
            ));
            graph.push_str(&format!(
                "[bg{index}][{fg_label}]overlay={}:{}[ov{index}];",
                fg.x, fg.y
            ));
            format!("ov{index}")
        }
        None => fg_label,
    };

    graph.push_str(&format!("[{composed}]fps={}", timeline.fps));
    if seg.kind == MediaKind::Video {
        if seg.stretched {
            // Hold the last frame when the allocation outlasts the source.
            graph.push_str(&format!(
                ",tpad=stop_mode=clone:stop_duration={}",
                format_secs(seg.duration)
            ));
        }
        graph.push_str(&format!(
            ",trim=duration={},setpts=PTS-STARTPTS",
            format_secs(seg.duration)
        ));
    }
    if seg.fade_in > 0.0 {
        graph.push_str(&format!(",fade=t=in:st=0:d={}", format_secs(seg.fade_in)));
    }
    if seg.fade_out > 0.0 {
        graph.push_str(&format!(
            ",fade=t=out:st={}:d={}",
            format_secs(seg.duration - seg.fade_out),
            format_secs(seg.fade_out)
        ));
    }
    graph.push_str(&format!("[seg{index}];"));
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.3}")
}
