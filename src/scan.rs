use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::Context as _;
use chrono::{DateTime, Local};
use walkdir::WalkDir;

use crate::{
    error::{MontageError, MontageResult},
    media::{MediaItem, MediaKind},
};

pub const PHOTO_EXTS: &[&str] = &["jpg", "jpeg", "png", "heic"];
pub const VIDEO_EXTS: &[&str] = &["mp4", "mov"];

/// Why a file found under the input root was not turned into a media item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    UnsupportedExtension,
    ZeroByte,
    Unreadable,
    ProbeFailed,
}

impl ExclusionReason {
    fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::UnsupportedExtension => "extension",
            ExclusionReason::ZeroByte => "zero_byte",
            ExclusionReason::Unreadable => "unreadable",
            ExclusionReason::ProbeFailed => "probe_failed",
        }
    }
}

/// What a scan saw, for diagnostics and the dry-run surface.
#[derive(Clone, Debug, Default)]
pub struct ScanReport {
    pub root: PathBuf,
    pub recursive: bool,
    pub found_files: usize,
    pub excluded: Vec<(ExclusionReason, PathBuf)>,
    pub media_count: usize,
}

impl ScanReport {
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Scan input: {}", self.root.display()),
            format!(
                "Scan mode: {}",
                if self.recursive { "recursive" } else { "flat" }
            ),
            format!(
                "Allowed extensions: photos={} videos={}",
                PHOTO_EXTS.join(","),
                VIDEO_EXTS.join(",")
            ),
            format!(
                "Files found: {}, excluded: {}, media: {}",
                self.found_files,
                self.excluded.len(),
                self.media_count
            ),
        ];
        if !self.excluded.is_empty() {
            let mut parts = Vec::new();
            for reason in [
                ExclusionReason::UnsupportedExtension,
                ExclusionReason::ZeroByte,
                ExclusionReason::Unreadable,
                ExclusionReason::ProbeFailed,
            ] {
                let count = self.excluded.iter().filter(|(r, _)| *r == reason).count();
                if count > 0 {
                    parts.push(format!("{}={count}", reason.as_str()));
                }
            }
            lines.push(format!("Excluded breakdown: {}", parts.join(", ")));
        }
        lines
    }
}

/// Scan `root` for supported media and return items ordered by capture time.
///
/// Flat by default; `recursive` walks subdirectories. Photos are probed for
/// dimensions from the image header only; videos are probed with `ffprobe`.
/// The ordering timestamp is the file's mtime, with the path as a
/// deterministic tie-breaker.
pub fn scan_media(root: &Path, recursive: bool) -> MontageResult<(Vec<MediaItem>, ScanReport)> {
    if !root.is_dir() {
        return Err(MontageError::config(format!(
            "input directory '{}' does not exist or is not a directory",
            root.display()
        )));
    }

    let mut report = ScanReport {
        root: root.to_path_buf(),
        recursive,
        ..ScanReport::default()
    };
    let mut items = Vec::new();

    let max_depth = if recursive { usize::MAX } else { 1 };
    for entry in WalkDir::new(root).max_depth(max_depth) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable directory entry");
                if let Some(p) = e.path() {
                    report
                        .excluded
                        .push((ExclusionReason::Unreadable, p.to_path_buf()));
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.found_files += 1;
        let path = entry.path();

        let Some(kind) = classify(path) else {
            report
                .excluded
                .push((ExclusionReason::UnsupportedExtension, path.to_path_buf()));
            continue;
        };

        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot stat file");
                report
                    .excluded
                    .push((ExclusionReason::Unreadable, path.to_path_buf()));
                continue;
            }
        };
        if meta.len() == 0 {
            report
                .excluded
                .push((ExclusionReason::ZeroByte, path.to_path_buf()));
            continue;
        }
        let captured_at = meta
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_default();

        let probed = match kind {
            MediaKind::Photo => probe_photo(path),
            MediaKind::Video => probe_video(path),
        };
        match probed {
            Ok((width, height, native_duration)) => items.push(MediaItem {
                path: path.to_path_buf(),
                kind,
                width,
                height,
                native_duration,
                captured_at,
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "probe failed, skipping");
                report
                    .excluded
                    .push((ExclusionReason::ProbeFailed, path.to_path_buf()));
            }
        }
    }

    items.sort_by(|a, b| {
        a.captured_at
            .cmp(&b.captured_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    report.media_count = items.len();
    tracing::debug!(
        media = report.media_count,
        excluded = report.excluded.len(),
        "scan finished"
    );
    Ok((items, report))
}

fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if PHOTO_EXTS.contains(&ext.as_str()) {
        Some(MediaKind::Photo)
    } else if VIDEO_EXTS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn probe_photo(path: &Path) -> anyhow::Result<(u32, u32, Option<f64>)> {
    let (w, h) = image::image_dimensions(path)
        .with_context(|| format!("read image header '{}'", path.display()))?;
    anyhow::ensure!(w > 0 && h > 0, "image has zero dimensions");
    Ok((w, h, None))
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe a video's dimensions and duration with the system `ffprobe`.
fn probe_video(path: &Path) -> anyhow::Result<(u32, u32, Option<f64>)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context("spawn ffprobe (is it installed and on PATH?)")?;
    anyhow::ensure!(
        output.status.success(),
        "ffprobe exited with status {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    );

    let probe: ProbeOutput =
        serde_json::from_slice(&output.stdout).context("parse ffprobe JSON output")?;
    let stream = probe
        .streams
        .first()
        .context("ffprobe reported no video stream")?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => anyhow::bail!("ffprobe reported no usable dimensions"),
    };
    let native_duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0);
    Ok((width, height, native_duration))
}
