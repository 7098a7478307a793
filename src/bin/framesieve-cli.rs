use std::{path::PathBuf, sync::Arc};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesieve::{
    FfmpegLogLevel, Pipeline, PipelineConfig, ProgressCallback, ProgressInfo, RunSummary, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framesieve run\n  framesieve --progress run --root /data/session-12 --stride 15\n  framesieve --json run --ext mp4 --ext mov --output review/inspection.csv\n  framesieve discover --video-dir videos\n  framesieve completions zsh > _framesieve";

#[derive(Debug, Parser)]
#[command(
    name = "framesieve",
    version,
    about = "Sample video frames, emit placeholder predictions, and build an inspection manifest",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while videos are sampled.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Print results as machine-readable JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args, Clone)]
struct LayoutArgs {
    /// Base directory for the default videos/, frames/, predict/ and inspection.csv.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Directory scanned for videos.
    #[arg(long)]
    video_dir: Option<PathBuf>,
    /// Directory receiving sampled frames.
    #[arg(long)]
    frame_dir: Option<PathBuf>,
    /// Directory receiving prediction images.
    #[arg(long)]
    predict_dir: Option<PathBuf>,
    /// Manifest path.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Video extension to pick up (repeatable).
    #[arg(long = "ext", default_values_t = ["mp4".to_string(), "avi".to_string()])]
    extensions: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample every discovered video and write the manifest.
    #[command(
        about = "Run the sampling pipeline",
        after_help = "Examples:\n  framesieve run --stride 30\n  framesieve run --root session --workers 4"
    )]
    Run {
        #[command(flatten)]
        layout: LayoutArgs,
        /// Keep every Nth frame, starting at frame 0.
        #[arg(long, default_value_t = 30)]
        stride: u64,
        /// Videos processed concurrently (requires the `rayon` feature).
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },

    /// List the videos a run would process, in processing order.
    #[command(about = "List discoverable videos")]
    Discover {
        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn build_config(layout: &LayoutArgs) -> PipelineConfig {
    let mut config = match &layout.root {
        Some(root) => PipelineConfig::rooted_at(root),
        None => PipelineConfig::new(),
    };
    if let Some(path) = &layout.video_dir {
        config = config.with_video_dir(path);
    }
    if let Some(path) = &layout.frame_dir {
        config = config.with_frame_dir(path);
    }
    if let Some(path) = &layout.predict_dir {
        config = config.with_predict_dir(path);
    }
    if let Some(path) = &layout.output {
        config = config.with_output_csv(path);
    }
    config.with_video_extensions(layout.extensions.iter().cloned())
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        framesieve::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.videos_total);
        self.bar.set_position(info.videos_done);
        match info.stage {
            Stage::Finalizing => self.bar.finish_with_message("done"),
            _ => {
                if let Some(video) = &info.current_video {
                    self.bar.set_message(video.clone());
                }
            }
        }
    }
}

fn print_summary(summary: &RunSummary, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "videos_discovered": summary.videos_discovered,
            "videos_processed": summary.videos_processed,
            "skipped": summary.skipped.iter().map(|skipped| json!({
                "path": skipped.path.display().to_string(),
                "reason": skipped.reason,
            })).collect::<Vec<_>>(),
            "frames_decoded": summary.frames_decoded,
            "records_written": summary.records_written,
            "used_fallback": summary.used_fallback,
            "cancelled": summary.cancelled,
            "manifest": summary.manifest_path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for skipped in &summary.skipped {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("skipped {}: {}", skipped.path.display(), skipped.reason).yellow()
        );
    }
    if summary.used_fallback {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "no video files found, wrote a sample record".yellow()
        );
    }
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Sampled {} of {} video(s) ({} frames decoded), wrote {} row(s) to {}",
            summary.videos_processed,
            summary.videos_discovered,
            summary.frames_decoded,
            summary.records_written,
            summary.manifest_path.display()
        )
        .green()
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Run {
            layout,
            stride,
            workers,
        } => {
            if stride == 0 {
                return Err("--stride must be greater than 0".into());
            }
            #[cfg(not(feature = "rayon"))]
            if workers > 1 {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "--workers requires building with the `rayon` feature".yellow()
                );
            }

            let mut config = build_config(&layout)
                .with_frame_stride(stride)
                .with_workers(workers);
            if cli.global.progress {
                config = config.with_progress(Arc::new(TerminalProgress::new()?));
            }

            let summary = Pipeline::new(config).run()?;
            print_summary(&summary, cli.global.json)?;
        }
        Commands::Discover { layout } => {
            let config = build_config(&layout);
            let videos = framesieve::discover_videos(&config.video_dir, &config.video_extensions)?;
            if cli.global.json {
                let paths: Vec<String> = videos
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json!({ "videos": paths }))?);
            } else if videos.is_empty() {
                println!("No video files found in {}", config.video_dir.display());
            } else {
                for path in &videos {
                    println!("{}", path.display());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesieve", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
