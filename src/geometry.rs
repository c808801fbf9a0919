//! Progress bar geometry.
//!
//! Everything here is a pure function of the canvas size, the bar settings and
//! the step being rendered, so any step can be computed independently of the
//! others.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GifProgressError, Result};

/// Pixel size shared by every frame of a run, taken from the first source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Rejects a zero width or height.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GifProgressError::bar_spec(format!(
                "canvas must be non-empty, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Edge of the canvas the bar is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarPosition {
    Top,
    #[default]
    Bottom,
}

impl FromStr for BarPosition {
    type Err = GifProgressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(GifProgressError::bar_spec(format!(
                "bar position must be \"top\" or \"bottom\", got \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for BarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        })
    }
}

/// Bar thickness (percent of the canvas height) and placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarSpec {
    pub height_percent: f64,
    pub position: BarPosition,
}

impl BarSpec {
    /// Builds a spec, rejecting heights outside `(0, 100]`.
    pub fn new(height_percent: f64, position: BarPosition) -> Result<Self> {
        if !height_percent.is_finite() || height_percent <= 0.0 || height_percent > 100.0 {
            return Err(GifProgressError::bar_spec(format!(
                "bar height must be in (0, 100] percent, got {}",
                height_percent
            )));
        }
        Ok(Self {
            height_percent,
            position,
        })
    }
}

impl Default for BarSpec {
    fn default() -> Self {
        Self {
            height_percent: 1.0,
            position: BarPosition::Bottom,
        }
    }
}

/// Filled region of the overlay for one step, half-open on `x1` and `y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BarRect {
    /// Filled width in pixels
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Filled height in pixels
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// True when nothing is filled, as on the first step.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether pixel `(x, y)` lies inside the filled region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Width in pixels of the bar at `step_index` out of `total_steps`.
///
/// The last step is always exactly `canvas_width`, and this check runs before
/// the first-step check so a single-frame run (`total_steps == 0`) gets a full
/// bar. Intermediate steps divide in `f64` before rounding.
pub fn bar_width(canvas_width: u32, total_steps: usize, step_index: usize) -> u32 {
    if step_index >= total_steps {
        return canvas_width;
    }
    if step_index == 0 {
        return 0;
    }
    let width = canvas_width as f64 / total_steps as f64 * step_index as f64;
    (width.round() as u32).min(canvas_width)
}

/// Vertical extent `(y_start, y_end)` of the bar.
pub fn bar_band(canvas_height: u32, height_percent: f64, position: BarPosition) -> (u32, u32) {
    let bar_height = (canvas_height as f64 * height_percent / 100.0).floor();
    let bar_height = (bar_height.max(0.0) as u32).min(canvas_height);
    match position {
        BarPosition::Top => (0, bar_height),
        BarPosition::Bottom => (canvas_height - bar_height, canvas_height),
    }
}

pub fn bar_rect(canvas: Canvas, spec: &BarSpec, step_index: usize, total_steps: usize) -> BarRect {
    let (y0, y1) = bar_band(canvas.height, spec.height_percent, spec.position);
    BarRect {
        x0: 0,
        y0,
        x1: bar_width(canvas.width, total_steps, step_index),
        y1,
    }
}

/// Bar widths for every step of a run with `frame_count` frames.
pub fn bar_widths(canvas_width: u32, frame_count: usize) -> Vec<u32> {
    let total_steps = frame_count.saturating_sub(1);
    (0..frame_count)
        .map(|i| bar_width(canvas_width, total_steps, i))
        .collect()
}
