use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use montage::{
    build_timeline, load_config_file, resolve_config, scan_media, ConfigOverlay, FfmpegBackend,
    MediaItem, RenderBackend as _, RenderOptions, ScanReport, Timeline, TimelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "montage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the input and print the planned timeline without rendering.
    Plan(PlanArgs),
    /// Scan, plan, and render the montage MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct SharedArgs {
    /// Input directory to scan for photos and videos.
    #[arg(long, default_value = "./input")]
    input: PathBuf,

    /// Scan subdirectories recursively.
    #[arg(long)]
    recursive: bool,

    /// TOML config file, applied between preset and flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset of defaults: youtube, mobile, preview.
    #[arg(long)]
    preset: Option<String>,

    /// Output resolution as WIDTHxHEIGHT (e.g. 1920x1080).
    #[arg(long)]
    resolution: Option<String>,

    /// Target total duration in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Base seconds per photo.
    #[arg(long)]
    photo_seconds: Option<f64>,

    /// Cap on seconds per photo when filling a deficit.
    #[arg(long)]
    photo_max_seconds: Option<f64>,

    /// Cap on seconds taken from each video.
    #[arg(long)]
    video_max_seconds: Option<f64>,

    /// Crossfade length between clips in seconds; 0 disables.
    #[arg(long)]
    transition: Option<f64>,

    /// Max fade as a fraction of clip length (default 1.0 = no cap).
    #[arg(long)]
    fade_max_ratio: Option<f64>,

    /// Background blur radius for letterboxed clips; 0 disables the layer.
    #[arg(long)]
    bg_blur: Option<f64>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Keep video native durations and let them drive canvas sizing.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    preserve_videos: Option<bool>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Print the full plan as JSON instead of the summary.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Output MP4 path.
    #[arg(long, default_value = "./output/montage.mp4")]
    out: PathBuf,

    /// Fail instead of overwriting an existing output file.
    #[arg(long)]
    no_overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Render(args) => cmd_render(args),
    }
}

impl SharedArgs {
    fn overlay(&self) -> ConfigOverlay {
        ConfigOverlay {
            resolution: self.resolution.clone(),
            fps: self.fps,
            duration: self.duration,
            photo_seconds: self.photo_seconds,
            photo_max_seconds: self.photo_max_seconds,
            video_max_seconds: self.video_max_seconds,
            transition: self.transition,
            fade_max_ratio: self.fade_max_ratio,
            bg_blur: self.bg_blur,
            preserve_videos: self.preserve_videos,
        }
    }

    fn resolve(&self) -> anyhow::Result<TimelineConfig> {
        let file = self
            .config
            .as_deref()
            .map(load_config_file)
            .transpose()
            .context("load config file")?;
        let cfg = resolve_config(self.preset.as_deref(), file.as_ref(), &self.overlay())?;
        Ok(cfg)
    }

    fn scan(&self) -> anyhow::Result<(Vec<MediaItem>, ScanReport)> {
        let (items, report) = scan_media(&self.input, self.recursive)?;
        Ok((items, report))
    }
}

fn plan_timeline(shared: &SharedArgs) -> anyhow::Result<Option<(Timeline, ScanReport)>> {
    let cfg = shared.resolve()?;
    let (items, report) = shared.scan()?;
    if items.is_empty() {
        for line in report.summary_lines() {
            eprintln!("{line}");
        }
        eprintln!("no media found");
        if !shared.recursive {
            eprintln!("hint: try --recursive to include subfolders");
        }
        return Ok(None);
    }
    let timeline = build_timeline(&items, &cfg)?;
    Ok(Some((timeline, report)))
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let Some((timeline, report)) = plan_timeline(&args.shared)? else {
        std::process::exit(2);
    };

    if args.json {
        serde_json::to_writer_pretty(std::io::stdout().lock(), &timeline)
            .context("write plan JSON")?;
        println!();
        return Ok(());
    }

    for line in report.summary_lines() {
        println!("{line}");
    }
    for line in timeline.summary_lines() {
        println!("{line}");
    }
    for (i, seg) in timeline.segments.iter().enumerate() {
        println!(
            "  {i:>3} {:<5} {:7.3}s @ {:7.3}s {:?} {}",
            seg.kind.as_str(),
            seg.duration,
            seg.start,
            seg.fit,
            seg.path.display()
        );
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let Some((timeline, _report)) = plan_timeline(&args.shared)? else {
        std::process::exit(2);
    };

    for line in timeline.summary_lines() {
        eprintln!("{line}");
    }

    let backend = FfmpegBackend;
    let opts = RenderOptions {
        out_path: args.out.clone(),
        overwrite: !args.no_overwrite,
    };
    backend
        .render(&timeline, &opts)
        .with_context(|| format!("render with {} backend", backend.name()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
