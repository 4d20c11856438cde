mod console;

use clap::Parser;
use console::{stdin_lines, ConsoleCommands, ConsoleSelector, PngPreview};
use followcam::{
    AspectRatio, CalibrationEvent, CropGeometry, EncoderSettings, FfmpegSink, FfmpegSource,
    FrameReport, FrameSource, MatchConfig, Preview, ReferenceLibrary, Region, Session, SessionIo,
    SessionObserver, TrackerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(
    name = "followcam",
    author,
    version,
    about = "Crop a landscape recording to a vertical video that follows one sprite"
)]
struct Cli {
    /// Input video.
    #[arg(required_unless_present = "print_example")]
    video: Option<PathBuf>,
    /// Directory of reference sprite images (searched recursively).
    #[arg(long, value_name = "DIR")]
    sprites: Option<PathBuf>,
    /// Output video (default: `<video stem>_vertical.mp4` next to the input).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Optional JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Reduction factor used for matching, in (0, 1].
    #[arg(long)]
    scale: Option<f32>,
    /// Camera smoothing factor, in (0, 1].
    #[arg(long)]
    smoothing: Option<f64>,
    /// Minimum match score accepted as a detection.
    #[arg(long)]
    threshold: Option<f32>,
    /// Answer the initial selection with `x,y,w,h`.
    #[arg(long, value_name = "X,Y,W,H")]
    initial_region: Option<Region>,
    /// Disable the stdin operator console.
    #[arg(long)]
    headless: bool,
    /// Rewrite this PNG with an annotated preview while rendering.
    #[arg(long, value_name = "PNG")]
    preview: Option<PathBuf>,
    /// Log per-frame library diagnostics.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct Config {
    scale: f32,
    smoothing: f64,
    match_threshold: f32,
    output_width: u32,
    output_height: u32,
    aspect: [u32; 2],
    preview_every: u64,
    preview_height: u32,
    progress_every: u64,
    min_var_i: f32,
    parallel: bool,
    sprites_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    preset: String,
    crf: u8,
}

impl Default for Config {
    fn default() -> Self {
        let tracker = TrackerConfig::default();
        let matcher = MatchConfig::default();
        Self {
            scale: tracker.scale,
            smoothing: tracker.smoothing,
            match_threshold: tracker.match_threshold,
            output_width: tracker.output_width,
            output_height: tracker.output_height,
            aspect: [tracker.aspect.num, tracker.aspect.den],
            preview_every: tracker.preview_every,
            preview_height: 600,
            progress_every: tracker.progress_every,
            min_var_i: matcher.min_var_i,
            parallel: true,
            sprites_dir: None,
            output_path: None,
            preset: "veryfast".to_string(),
            crf: 20,
        }
    }
}

impl Config {
    fn apply(&mut self, cli: &Cli) {
        if let Some(scale) = cli.scale {
            self.scale = scale;
        }
        if let Some(smoothing) = cli.smoothing {
            self.smoothing = smoothing;
        }
        if let Some(threshold) = cli.threshold {
            self.match_threshold = threshold;
        }
        if let Some(dir) = &cli.sprites {
            self.sprites_dir = Some(dir.clone());
        }
        if let Some(path) = &cli.output {
            self.output_path = Some(path.clone());
        }
    }

    fn tracker(&self) -> TrackerConfig {
        TrackerConfig {
            scale: self.scale,
            smoothing: self.smoothing,
            match_threshold: self.match_threshold,
            output_width: self.output_width,
            output_height: self.output_height,
            aspect: AspectRatio {
                num: self.aspect[0],
                den: self.aspect[1],
            },
            preview_every: self.preview_every,
            progress_every: self.progress_every,
            matcher: MatchConfig {
                min_var_i: self.min_var_i,
                parallel: self.parallel,
            },
        }
    }
}

/// `sprites/` next to the executable, then `./sprites`.
fn default_sprites_dir() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("sprites")));
    match beside_exe {
        Some(dir) if dir.is_dir() => dir,
        _ => PathBuf::from("sprites"),
    }
}

fn default_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    video.with_file_name(format!("{stem}_vertical.mp4"))
}

/// Places a relative output path in the input video's directory.
fn resolve_output_path(video: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        None => default_output_path(video),
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => video
            .parent()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|| path.to_path_buf()),
    }
}

/// Logs calibration outcomes and drives the progress bar.
struct Reporter {
    bar: ProgressBar,
}

impl Reporter {
    fn new(total: Option<u64>) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos}/{len} frames [{elapsed_precise} < {eta}] {msg}",
                )?);
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(ProgressStyle::with_template(
                    "{spinner:.cyan} {pos} frames [{elapsed_precise}] {msg}",
                )?);
                bar
            }
        };
        Ok(Self { bar })
    }
}

impl SessionObserver for Reporter {
    fn on_calibration(&mut self, event: &CalibrationEvent) {
        self.bar.suspend(|| match event {
            CalibrationEvent::LibraryReady { templates } => {
                info!(templates, "reference library ready")
            }
            CalibrationEvent::InitialTemplate { region, camera_x } => {
                info!(?region, camera_x, "initial template captured")
            }
            CalibrationEvent::Recentered { region, camera_x } => {
                info!(?region, camera_x, "camera re-centered")
            }
            CalibrationEvent::TemplateAdded {
                region,
                camera_x,
                templates,
            } => info!(?region, camera_x, templates, "reference pose added"),
            CalibrationEvent::TemplateRejected {
                region,
                camera_x,
                reason,
            } => warn!(?region, camera_x, %reason, "camera re-centered, pose not added"),
            CalibrationEvent::SelectionIgnored { prompt } => {
                warn!(?prompt, "empty selection ignored")
            }
        });
    }

    fn on_frame(&mut self, index: u64, report: &FrameReport) {
        debug!(
            frame = index,
            lost = report.lost,
            score = report.score().unwrap_or(f32::NAN),
            camera_x = report.camera.x,
            crop_x = report.window.x,
            "frame"
        );
        self.bar.set_message(if report.lost { "LOST" } else { "" });
    }

    fn on_progress(&mut self, processed: u64, _total: Option<u64>) {
        self.bar.set_position(processed);
    }
}

fn init_logging(trace: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if trace => EnvFilter::new("info,followcam=debug"),
        Err(_) => EnvFilter::new("info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }
    init_logging(cli.trace);

    let mut config = match &cli.config {
        Some(path) => serde_json::from_str::<Config>(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    config.apply(&cli);
    let tracker = config.tracker();
    tracker.validate()?;

    let video = cli.video.clone().ok_or("an input video is required")?;
    let mut source = FfmpegSource::open(&video)?;
    let info = source.info();
    CropGeometry::new(info.width, info.height, tracker.aspect)?;
    info!(
        video = %video.display(),
        width = info.width,
        height = info.height,
        fps = info.fps,
        frames = ?info.frames,
        "source opened"
    );

    let sprites = config.sprites_dir.clone().unwrap_or_else(default_sprites_dir);
    let (library, report) = ReferenceLibrary::load(&sprites, tracker.scale)?;
    if report.missing_root {
        warn!(dir = %sprites.display(), "sprites directory not found");
    }
    for skipped in &report.skipped {
        warn!(path = %skipped.path.display(), error = %skipped.error, "sprite skipped");
    }
    info!(dir = %sprites.display(), loaded = report.loaded.len(), "sprites loaded");

    let mut session = Session::new(tracker, library)?;

    let output = resolve_output_path(&video, config.output_path.as_deref());
    let mut settings = EncoderSettings::new(config.output_width, config.output_height, info.fps);
    settings.preset = config.preset.clone();
    settings.crf = config.crf;
    let mut sink = FfmpegSink::create(&output, &settings)?;
    info!(output = %output.display(), "encoding");

    let lines = (!cli.headless).then(stdin_lines);
    if lines.is_some() {
        info!("type q to quit, s to re-center, a to add a pose (then Enter)");
    }
    let snapshot = std::env::temp_dir().join("followcam-select.png");
    let mut commands = ConsoleCommands::new(lines.clone());
    let mut selector = ConsoleSelector::new(lines, snapshot, cli.initial_region);
    let mut preview = cli
        .preview
        .clone()
        .map(|path| PngPreview::new(path, config.preview_height));
    let mut reporter = Reporter::new(info.frames)?;

    let summary = session.run(SessionIo {
        source: &mut source,
        sink: &mut sink,
        commands: &mut commands,
        selector: &mut selector,
        preview: preview.as_mut().map(|p| p as &mut dyn Preview),
        observer: &mut reporter,
    });
    reporter.bar.finish_and_clear();
    let summary = summary?;

    info!(
        output = %output.display(),
        frames = summary.frames,
        lost = summary.lost_frames,
        templates = summary.templates,
        quit = summary.quit,
        "done"
    );
    Ok(())
}
