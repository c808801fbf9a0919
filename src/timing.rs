use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GifProgressError, Result};

/// Frames per second as a reduced rational, in the `num/den` form ffmpeg accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(GifProgressError::InvalidDelay(format!(
                "frame rate {}/{} must be positive",
                num, den
            )));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn from_fps(fps: u32) -> Result<Self> {
        Self::new(fps, 1)
    }

    /// Rate showing each frame for `seconds`, at millisecond precision.
    pub fn from_delay(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(GifProgressError::InvalidDelay(format!(
                "delay must be a positive number of seconds, got {}",
                seconds
            )));
        }
        let millis = (seconds * 1000.0).round();
        if millis < 1.0 || millis > u32::MAX as f64 {
            return Err(GifProgressError::InvalidDelay(format!(
                "delay {}s is outside the supported range",
                seconds
            )));
        }
        Self::new(1000, millis as u32)
    }

    pub fn frame_delay_secs(&self) -> f64 {
        self.den as f64 / self.num as f64
    }
}

impl FromStr for FrameRate {
    type Err = GifProgressError;

    /// Accepts ffprobe's `r_frame_rate` (`30000/1001`) or a plain integer.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || GifProgressError::InvalidDelay(format!("unparseable frame rate \"{}\"", s));
        match s.split_once('/') {
            Some((n, d)) => Self::new(
                n.trim().parse().map_err(|_| invalid())?,
                d.trim().parse().map_err(|_| invalid())?,
            ),
            None => Self::from_fps(s.parse().map_err(|_| invalid())?),
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
