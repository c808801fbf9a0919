use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::BarColor;
use crate::error::{GifProgressError, Result};
use crate::geometry::BarPosition;

pub const CONFIG_STEM: &str = "gif-progress";

/// Locations of the external ffmpeg tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
    #[serde(default)]
    pub ffprobe_path: Option<String>,
}

impl FfmpegConfig {
    /// Command used to run ffmpeg
    pub fn ffmpeg_cmd(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
    }

    /// Command used to run ffprobe
    pub fn ffprobe_cmd(&self) -> &str {
        self.ffprobe_path.as_deref().unwrap_or("ffprobe")
    }
}

/// Tuning for the two-pass GIF palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Sampling rate palettegen reads the sequence at
    #[serde(default = "default_palette_fps")]
    pub fps: u32,
    /// swscale flags used by both passes
    #[serde(default = "default_scale_flags")]
    pub scale_flags: String,
    #[serde(default = "default_max_colors")]
    pub max_colors: u16,
}

fn default_palette_fps() -> u32 {
    10
}

fn default_scale_flags() -> String {
    "lanczos".to_string()
}

fn default_max_colors() -> u16 {
    256
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            fps: default_palette_fps(),
            scale_flags: default_scale_flags(),
            max_colors: default_max_colors(),
        }
    }
}

fn default_bar_color() -> BarColor {
    BarColor::default()
}
fn default_bar_height() -> f64 {
    1.0
}
fn default_delay() -> f64 {
    1.5
}
fn default_output_file() -> PathBuf {
    PathBuf::from("output.gif")
}

/// Defaults for every CLI setting, loadable from JSON or TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bar_color")]
    pub bar_color: BarColor,
    #[serde(default = "default_bar_height")]
    pub bar_height: f64,
    #[serde(default)]
    pub bar_position: BarPosition,
    #[serde(default = "default_delay")]
    pub delay: f64,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bar_color: default_bar_color(),
            bar_height: default_bar_height(),
            bar_position: BarPosition::Bottom,
            delay: default_delay(),
            output_file: default_output_file(),
            palette: PaletteConfig::default(),
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parses a config file, picking the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            GifProgressError::config(format!("reading {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            toml::from_str(&text).map_err(|e| {
                GifProgressError::config(format!("parsing {}: {}", path.display(), e))
            })
        } else {
            serde_json::from_str(&text).map_err(|e| {
                GifProgressError::config(format!("parsing {}: {}", path.display(), e))
            })
        }
    }

    /// Candidate config paths in lookup order: app data dir, then the working directory.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut tried = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push(CONFIG_STEM);
            for ext in ["json", "toml"] {
                tried.push(d.join(format!("{}.{}", CONFIG_STEM, ext)));
            }
        }
        for ext in ["json", "toml"] {
            tried.push(PathBuf::from(format!("{}.{}", CONFIG_STEM, ext)));
        }
        tried
    }

    /// Loads `explicit` if given, else the first existing search path, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::from_file(p);
        }
        for p in Self::search_paths() {
            if p.is_file() {
                tracing::debug!(path = %p.display(), "loading config");
                return Self::from_file(&p);
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_cli_help() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bar_color.to_string(), "#f12b24");
        assert_eq!(cfg.bar_height, 1.0);
        assert_eq!(cfg.bar_position, BarPosition::Bottom);
        assert_eq!(cfg.delay, 1.5);
        assert_eq!(cfg.output_file, PathBuf::from("output.gif"));
        assert_eq!(cfg.ffmpeg.ffmpeg_cmd(), "ffmpeg");
        assert_eq!(cfg.ffmpeg.ffprobe_cmd(), "ffprobe");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gif-progress.json");
        fs::write(&path, r#"{"bar_color": "blue", "bar_position": "top"}"#).unwrap();
        let cfg = AppConfig::from_file(&path).unwrap();
        assert_eq!(cfg.bar_color, BarColor::rgb(0, 0, 255));
        assert_eq!(cfg.bar_position, BarPosition::Top);
        assert_eq!(cfg.delay, 1.5);
        assert_eq!(cfg.palette, PaletteConfig::default());
    }

    #[test]
    fn toml_config_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gif-progress.toml");
        fs::write(
            &path,
            "delay = 0.25\noutput_file = \"out.mov\"\n\n[palette]\nfps = 15\n\n[ffmpeg]\nffmpeg_path = \"/opt/ffmpeg\"\n",
        )
        .unwrap();
        let cfg = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.delay, 0.25);
        assert_eq!(cfg.output_file, PathBuf::from("out.mov"));
        assert_eq!(cfg.palette.fps, 15);
        assert_eq!(cfg.palette.scale_flags, "lanczos");
        assert_eq!(cfg.ffmpeg.ffmpeg_cmd(), "/opt/ffmpeg");
    }

    #[test]
    fn bad_config_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, GifProgressError::Config(_)));
        assert!(err.to_string().contains("broken.json"));
    }
}
