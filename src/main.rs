use anyhow::{Context, Result};
use clap::Parser;
use gif_progress::{
    AnnotateOptions, AppConfig, BarColor, BarPosition, CancelToken, Progress, ProgressAnnotator,
    ProgressPhase,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "gif-progress",
    version,
    about = "Add a progress bar to an animated GIF built from images or a video.",
    after_help = "Pass either exactly one video file, or two or more image files.\n\
                  Output ending in .mov is written directly; any other suffix becomes a palette-optimized GIF."
)]
struct Args {
    /// One video file, or two or more image files (in display order)
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Bar fill color (#rgb, #rrggbb, #rrggbbaa or a color name) [default: #f12b24]
    #[arg(short = 'c', long, value_name = "COLOR")]
    bar_color: Option<BarColor>,

    /// Bar height in percent of the frame height [default: 1]
    #[arg(short = 's', long, value_name = "PERCENT")]
    bar_height: Option<f64>,

    /// Where to draw the bar [default: bottom]
    #[arg(short = 'p', long, value_name = "top|bottom")]
    bar_position: Option<BarPosition>,

    /// Seconds each frame is shown, for image inputs [default: 1.5]
    #[arg(short = 'd', long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Output file [default: output.gif]
    #[arg(short = 'o', long, value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// Resample video input to this frame rate (default: the video's own rate)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    fps: Option<u32>,

    /// Config file (JSON or TOML) overriding the built-in defaults
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, default_value_t = false, conflicts_with = "quiet")]
    verbose: bool,

    /// Print nothing but errors
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gif-progress: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let cfg = AppConfig::load(args.config.as_deref()).context("loading config")?;
    let annotator = ProgressAnnotator::with_config(cfg);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("installing Ctrl-C handler")?;

    let mut options = annotator.default_options().with_cancel_token(cancel);
    if let Some(color) = args.bar_color {
        options = options.with_bar_color(color);
    }
    if let Some(height) = args.bar_height {
        options = options.with_bar_height(height);
    }
    if let Some(position) = args.bar_position {
        options = options.with_bar_position(position);
    }
    if let Some(delay) = args.delay {
        options = options.with_delay(delay);
    }
    if let Some(output) = args.output_file {
        options = options.with_output(output);
    }
    if let Some(fps) = args.fps {
        options = options.with_fps(fps);
    }
    options.validate()?;

    annotator.check_dependencies()?;

    let artifact = annotate(&annotator, &args.inputs, &options, args.quiet)?;

    if !args.quiet {
        println!(
            "Wrote {} ({} frames)",
            artifact.path.display(),
            artifact.frame_count
        );
    }
    Ok(())
}

fn annotate(
    annotator: &ProgressAnnotator,
    inputs: &[PathBuf],
    options: &AnnotateOptions,
    quiet: bool,
) -> Result<gif_progress::Artifact> {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")?
                .progress_chars("#>-"),
        );
        pb
    };
    let pb = bar.clone();

    let result = annotator.annotate_with_progress(inputs, options, move |progress: Progress| {
        match progress.phase {
            ProgressPhase::CompositingFrames => {
                pb.set_length(progress.total as u64);
                advance(&pb, progress.completed as u64);
            }
            ProgressPhase::Complete => {}
            _ => {
                if !pb.is_finished() && pb.position() > 0 {
                    pb.finish();
                }
                if !quiet {
                    println!("{}", progress.message);
                }
            }
        }
    });

    if !bar.is_finished() {
        bar.finish_and_clear();
    }
    Ok(result?)
}

/// Workers report out of order, so the bar only ever moves forward.
fn advance(pb: &ProgressBar, completed: u64) {
    pb.set_position(pb.position().max(completed));
}
