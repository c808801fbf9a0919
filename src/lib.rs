//! # gif-progress - progress bars for animated GIFs
//!
//! `gif-progress` draws a bar along the top or bottom edge of every frame of
//! an image sequence or a video, growing from empty on the first frame to the
//! full width on the last, and encodes the result as a GIF (or a MOV).
//!
//! ## Features
//!
//! - Image sequences (argument order) or a single video (extraction order)
//! - Configurable bar color, thickness and position
//! - Frames are composited in parallel
//! - Two-pass palette quantization for GIF output
//! - Progress reporting for integration with UI applications
//!
//! ## Example
//!
//! ```no_run
//! use gif_progress::{AnnotateOptions, BarPosition, ProgressAnnotator};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let annotator = ProgressAnnotator::new();
//! let options = AnnotateOptions::default()
//!     .with_bar_height(2.0)
//!     .with_bar_position(BarPosition::Top)
//!     .with_output("slides.gif");
//! let inputs = vec![PathBuf::from("1.png"), PathBuf::from("2.png"), PathBuf::from("3.png")];
//! annotator.annotate(&inputs, &options)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress Reporting
//!
//! ```no_run
//! use gif_progress::{AnnotateOptions, ProgressAnnotator, ProgressPhase};
//! use std::path::PathBuf;
//!
//! let annotator = ProgressAnnotator::new();
//! annotator.annotate_with_progress(
//!     &[PathBuf::from("clip.mp4")],
//!     &AnnotateOptions::default(),
//!     |progress| {
//!         if progress.phase == ProgressPhase::CompositingFrames {
//!             println!("{}/{} ({:.1}%)", progress.completed, progress.total, progress.percentage);
//!         }
//!     },
//! ).unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod backend;
pub mod color;
pub mod compositor;
pub mod config;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod source;
pub mod timing;

pub use backend::{FfmpegBackend, MediaBackend, MediaKind};
pub use color::BarColor;
pub use compositor::{CancelToken, FusedFrame};
pub use config::{AppConfig, FfmpegConfig, PaletteConfig};
pub use encoder::{Artifact, OutputKind};
pub use error::{GifProgressError, Result};
pub use geometry::{bar_band, bar_rect, bar_width, bar_widths, BarPosition, BarRect, BarSpec, Canvas};
pub use source::{FrameSource, SequenceKey, SourceKind, Step};
pub use timing::FrameRate;

/// Represents the current phase of an annotation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Classifying the inputs
    ResolvingInputs,
    /// Extracting frames from a video with ffmpeg
    ExtractingFrames,
    /// Drawing the bar onto each frame
    CompositingFrames,
    /// Running the encoder
    Encoding,
    /// The artifact has been written
    Complete,
}

/// Progress information for annotation runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if indeterminate)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    pub message: String,
}

impl Progress {
    fn indeterminate(phase: ProgressPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: message.into(),
        }
    }

    /// Create progress for input inspection
    pub fn resolving_inputs() -> Self {
        Self::indeterminate(ProgressPhase::ResolvingInputs, "Inspecting inputs...")
    }

    /// Create progress for video frame extraction
    pub fn extracting_frames() -> Self {
        Self::indeterminate(ProgressPhase::ExtractingFrames, "Extracting frames from video...")
    }

    /// Create progress for bar compositing
    pub fn compositing_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::CompositingFrames,
            completed,
            total,
            percentage,
            message: format!("Compositing frame {} of {}", completed, total),
        }
    }

    /// Create progress for the encoder passes
    pub fn encoding(kind: OutputKind) -> Self {
        let message = match kind {
            OutputKind::Mov => "Encoding MOV...",
            OutputKind::PaletteGif => "Encoding GIF (palette generation + palette use)...",
        };
        Self::indeterminate(ProgressPhase::Encoding, message)
    }

    /// Create progress for completion
    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Done: {} frames", total_frames),
        }
    }
}

/// Options for one annotation run
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub bar_color: BarColor,
    /// Bar thickness in percent of the canvas height, in (0, 100]
    pub bar_height: f64,
    pub bar_position: BarPosition,
    /// Seconds each frame is shown (image sequences, and videos of unknown rate)
    pub delay: f64,
    /// Resample video input to this many frames per second
    pub fps: Option<u32>,
    pub output: PathBuf,
    pub cancel: CancelToken,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AnnotateOptions {
    /// Create options from configuration defaults
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bar_color: config.bar_color,
            bar_height: config.bar_height,
            bar_position: config.bar_position,
            delay: config.delay,
            fps: None,
            output: config.output_file.clone(),
            cancel: CancelToken::new(),
        }
    }

    /// Set the bar fill color
    pub fn with_bar_color(mut self, color: BarColor) -> Self {
        self.bar_color = color;
        self
    }

    /// Set the bar thickness in percent of the frame height
    pub fn with_bar_height(mut self, percent: f64) -> Self {
        self.bar_height = percent;
        self
    }

    /// Set which edge the bar is drawn along
    pub fn with_bar_position(mut self, position: BarPosition) -> Self {
        self.bar_position = position;
        self
    }

    /// Set the per-frame delay in seconds
    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.delay = seconds;
        self
    }

    /// Resample video input to `fps` frames per second
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Set the output path; a `.mov` suffix skips GIF quantization
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Share a cancel token with the caller, e.g. a Ctrl-C handler
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bar height and position, validated
    pub fn bar_spec(&self) -> Result<BarSpec> {
        BarSpec::new(self.bar_height, self.bar_position)
    }

    /// Checks the settings that can be checked without touching any file.
    pub fn validate(&self) -> Result<()> {
        self.bar_spec()?;
        FrameRate::from_delay(self.delay)?;
        if self.fps == Some(0) {
            return Err(GifProgressError::InvalidDelay("fps must be positive".into()));
        }
        Ok(())
    }
}

/// Main entry point for annotating frames with a progress bar
pub struct ProgressAnnotator {
    config: AppConfig,
    backend: Box<dyn MediaBackend>,
}

impl ProgressAnnotator {
    /// Create an annotator with default configuration and the ffmpeg backend
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create an annotator with custom configuration
    pub fn with_config(config: AppConfig) -> Self {
        let backend = FfmpegBackend::new(config.ffmpeg.clone());
        Self {
            config,
            backend: Box::new(backend),
        }
    }

    /// Load configuration from a JSON or TOML file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self::with_config(AppConfig::from_file(path)?))
    }

    /// Replace the media backend, e.g. with a fake in tests
    pub fn with_backend(mut self, backend: impl MediaBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    /// Get the current configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    /// Options seeded from this annotator's configuration
    pub fn default_options(&self) -> AnnotateOptions {
        AnnotateOptions::from_config(&self.config)
    }

    /// Fails with `MissingDependency` when ffmpeg or ffprobe cannot be found
    pub fn check_dependencies(&self) -> Result<()> {
        self.backend.check_dependencies()
    }

    /// Annotate `inputs` (one video, or two or more images) and write the artifact.
    pub fn annotate(&self, inputs: &[PathBuf], options: &AnnotateOptions) -> Result<Artifact> {
        self.annotate_with_progress(inputs, options, |_| {})
    }

    /// Annotate with a callback receiving every phase change and composited frame
    pub fn annotate_with_progress<F>(
        &self,
        inputs: &[PathBuf],
        options: &AnnotateOptions,
        progress_callback: F,
    ) -> Result<Artifact>
    where
        F: Fn(Progress) + Send + Sync,
    {
        options.validate()?;
        pipeline::run(
            self.backend.as_ref(),
            inputs,
            options,
            &self.config.palette,
            progress_callback,
        )
    }
}

impl Default for ProgressAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compositing_percentage() {
        let p = Progress::compositing_frames(1, 4);
        assert_eq!(p.percentage, 25.0);
        assert_eq!(Progress::compositing_frames(0, 0).percentage, 0.0);
        assert_eq!(Progress::complete(9).completed, 9);
    }

    #[test]
    fn options_follow_config() {
        let cfg = AppConfig {
            delay: 0.5,
            bar_position: BarPosition::Top,
            ..AppConfig::default()
        };
        let opts = AnnotateOptions::from_config(&cfg).with_bar_height(5.0);
        assert_eq!(opts.delay, 0.5);
        assert_eq!(opts.bar_spec().unwrap(), BarSpec::new(5.0, BarPosition::Top).unwrap());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(AnnotateOptions::default().with_bar_height(0.0).validate().is_err());
        assert!(AnnotateOptions::default().with_delay(-1.0).validate().is_err());
        assert!(AnnotateOptions::default().with_fps(0).validate().is_err());
    }
}
