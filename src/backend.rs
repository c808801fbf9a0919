//! Media capabilities the pipeline needs, and the ffmpeg-backed implementation.
//!
//! Bar rendering and compositing run in-process on the `image` crate; probing,
//! frame extraction and encoding shell out to `ffmpeg`/`ffprobe`.

use image::{ImageFormat, Rgba, RgbaImage};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use walkdir::WalkDir;

use crate::color::BarColor;
use crate::compositor::FusedFrame;
use crate::config::{FfmpegConfig, PaletteConfig};
use crate::error::{GifProgressError, Result};
use crate::geometry::{BarRect, Canvas};
use crate::timing::FrameRate;

/// What a file's content says it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

/// Media operations the pipeline delegates; shared across compositing workers.
pub trait MediaBackend: Send + Sync {
    /// Fails with `MissingDependency` when a required tool is absent.
    fn check_dependencies(&self) -> Result<()>;

    /// Classifies a file by its content.
    fn sniff(&self, path: &Path) -> Result<MediaKind>;

    /// Native frame rate of a video, if it can be determined.
    fn frame_rate(&self, video: &Path) -> Result<Option<FrameRate>>;

    /// Writes the video's frames into `out_dir` and returns them in playback order.
    fn extract_frames(&self, video: &Path, out_dir: &Path, fps: Option<u32>) -> Result<Vec<PathBuf>>;

    /// Assembles `frames`, in slice order, into a lossless MOV at `out`.
    fn encode(&self, frames: &[FusedFrame], rate: FrameRate, out: &Path) -> Result<()>;

    /// Quantization pass 1: writes an optimal palette for `input` to `palette`.
    fn generate_palette(&self, input: &Path, palette: &Path, cfg: &PaletteConfig) -> Result<()>;

    /// Quantization pass 2: re-encodes `input` as a GIF using `palette`.
    fn apply_palette(&self, input: &Path, palette: &Path, out: &Path, cfg: &PaletteConfig) -> Result<()>;

    /// Both palette passes, with the palette kept in `scratch_dir`.
    fn quantize(&self, input: &Path, scratch_dir: &Path, out: &Path, cfg: &PaletteConfig) -> Result<()> {
        let palette = scratch_dir.join("palette.png");
        self.generate_palette(input, &palette, cfg)?;
        self.apply_palette(input, &palette, out, cfg)
    }

    /// Pixel size of a frame on disk.
    fn canvas_of(&self, frame: &Path) -> Result<Canvas> {
        let (width, height) = image::image_dimensions(frame)?;
        Canvas::new(width, height)
    }

    /// Overlay for one step: transparent except `rect`.
    fn render_rect(&self, canvas: Canvas, rect: BarRect, color: BarColor) -> Result<RgbaImage> {
        Ok(render_bar_overlay(canvas, rect, color))
    }

    /// Alpha-composites `overlay` over the frame at `source` and writes a PNG to `out`.
    fn composite(&self, source: &Path, overlay: &RgbaImage, out: &Path) -> Result<()> {
        let base = image::open(source)?.to_rgba8();
        fuse_overlay(base, overlay).save_with_format(out, ImageFormat::Png)?;
        Ok(())
    }
}

/// Canvas-sized transparent image with `rect` filled in `color`.
pub fn render_bar_overlay(canvas: Canvas, rect: BarRect, color: BarColor) -> RgbaImage {
    let mut overlay = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([0, 0, 0, 0]));
    let fill = color.to_rgba();
    for y in rect.y0..rect.y1.min(canvas.height) {
        for x in rect.x0..rect.x1.min(canvas.width) {
            overlay.put_pixel(x, y, fill);
        }
    }
    overlay
}

/// Source-over blend of `overlay` onto `base`, pixel for pixel from the origin.
///
/// Straight-alpha integer math, so an opaque base pixel stays exactly opaque.
pub fn fuse_overlay(mut base: RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let (width, height) = (base.width().min(overlay.width()), base.height().min(overlay.height()));
    for y in 0..height {
        for x in 0..width {
            let top = overlay.get_pixel(x, y);
            let px = base.get_pixel_mut(x, y);
            *px = blend_over(*px, *top);
        }
    }
    base
}

fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_a = src[3] as u32;
    match src_a {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    // weights scaled by 255 so both terms share a denominator
    let src_w = src_a * 255;
    let dst_w = dst[3] as u32 * (255 - src_a);
    let total = src_w + dst_w;
    if total == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| ((src[i] as u32 * src_w + dst[i] as u32 * dst_w + total / 2) / total) as u8;
    Rgba([channel(0), channel(1), channel(2), ((total + 127) / 255) as u8])
}

/// Production backend driving the system `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    config: FfmpegConfig,
}

impl FfmpegBackend {
    /// Backend using the tool paths in `config`.
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(self.config.ffmpeg_cmd());
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"]);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn ffprobe(&self) -> Command {
        let mut cmd = Command::new(self.config.ffprobe_cmd());
        cmd.args(["-v", "error", "-select_streams", "v:0"]);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Single value of a `-show_entries stream=<entry>` query, if any.
    fn probe_stream_entry(&self, path: &Path, entry: &str) -> Result<Option<String>> {
        let mut cmd = self.ffprobe();
        cmd.args(["-show_entries", &format!("stream={}", entry)])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path);
        let output = spawn_output(&mut cmd, self.config.ffprobe_cmd())?;
        if !output.status.success() {
            tracing::debug!(
                path = %path.display(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "ffprobe rejected input"
            );
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }
}

fn spawn_output(cmd: &mut Command, tool: &str) -> Result<Output> {
    tracing::debug!(command = ?cmd, "running");
    cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GifProgressError::missing_dependency(tool)
        } else {
            GifProgressError::Io(e)
        }
    })
}

fn stderr_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        format!("exited with {}: {}", output.status, stderr)
    }
}

fn run_encoder(cmd: &mut Command, tool: &str, what: &str) -> Result<()> {
    let output = spawn_output(cmd, tool)?;
    if !output.status.success() {
        return Err(GifProgressError::encoding(format!(
            "{} ({})",
            what,
            stderr_text(&output)
        )));
    }
    Ok(())
}

/// Orders `frame_<n>.png` files by `n`; ffmpeg widens the counter past its padding.
fn sort_by_frame_number(frames: &mut [PathBuf]) {
    frames.sort_by_cached_key(|p| {
        let number = p
            .file_stem()
            .and_then(OsStr::to_str)
            .and_then(|stem| stem.rsplit('_').next())
            .and_then(|n| n.parse::<u64>().ok());
        (number.is_none(), number, p.clone())
    });
}

/// Directory and pattern of a contiguous fused-frame sequence starting at index 0.
fn sequence_pattern(frames: &[FusedFrame]) -> Result<(PathBuf, String)> {
    let first = frames
        .first()
        .ok_or_else(|| GifProgressError::no_frames("nothing to encode"))?;
    let dir = first
        .path
        .parent()
        .ok_or_else(|| GifProgressError::encoding("fused frame has no parent directory"))?
        .to_path_buf();
    let ext = first
        .path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("png")
        .to_string();

    for (i, frame) in frames.iter().enumerate() {
        let expected = dir.join(frame.key.file_name(&ext));
        if frame.index != i || frame.key.digits != first.key.digits || frame.path != expected {
            return Err(GifProgressError::encoding(format!(
                "fused frames are not a contiguous sequence at step {} ({})",
                i,
                frame.path.display()
            )));
        }
    }
    Ok((dir, first.key.pattern(&ext)))
}

impl MediaBackend for FfmpegBackend {
    fn check_dependencies(&self) -> Result<()> {
        for tool in [self.config.ffmpeg_cmd(), self.config.ffprobe_cmd()] {
            which::which(tool).map_err(|_| GifProgressError::missing_dependency(tool))?;
        }
        Ok(())
    }

    fn sniff(&self, path: &Path) -> Result<MediaKind> {
        if !path.is_file() {
            return Err(GifProgressError::invalid_input(format!(
                "{} does not exist or is not a file",
                path.display()
            )));
        }
        let guessed = image::ImageReader::open(path)?.with_guessed_format()?;
        if guessed.format().is_some() {
            return Ok(MediaKind::Image);
        }
        let codec_type = self.probe_stream_entry(path, "codec_type")?;
        Ok(match codec_type.as_deref() {
            Some("video") => MediaKind::Video,
            _ => MediaKind::Other,
        })
    }

    fn frame_rate(&self, video: &Path) -> Result<Option<FrameRate>> {
        let Some(raw) = self.probe_stream_entry(video, "r_frame_rate")? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(rate) => Ok(Some(rate)),
            Err(e) => {
                tracing::warn!(path = %video.display(), raw = %raw, error = %e, "ignoring frame rate");
                Ok(None)
            }
        }
    }

    fn extract_frames(&self, video: &Path, out_dir: &Path, fps: Option<u32>) -> Result<Vec<PathBuf>> {
        let mut cmd = self.ffmpeg();
        cmd.arg("-i").arg(video);
        match fps {
            Some(fps) => {
                cmd.args(["-vf", &format!("fps={}", fps)]);
            }
            None => {
                cmd.args(["-fps_mode", "passthrough"]);
            }
        }
        cmd.arg(out_dir.join("frame_%06d.png"));

        let output = spawn_output(&mut cmd, self.config.ffmpeg_cmd())?;
        if !output.status.success() {
            return Err(GifProgressError::extraction(format!(
                "{}: ffmpeg {}",
                video.display(),
                stderr_text(&output)
            )));
        }

        let mut frames: Vec<PathBuf> = WalkDir::new(out_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        sort_by_frame_number(&mut frames);
        Ok(frames)
    }

    fn encode(&self, frames: &[FusedFrame], rate: FrameRate, out: &Path) -> Result<()> {
        let (dir, pattern) = sequence_pattern(frames)?;
        let mut cmd = self.ffmpeg();
        cmd.args(["-f", "image2", "-framerate", &rate.to_string(), "-start_number", "0"])
            .arg("-i")
            .arg(dir.join(pattern))
            .args(["-frames:v", &frames.len().to_string()])
            .args(["-c:v", "png", "-f", "mov"])
            .arg(out);
        run_encoder(&mut cmd, self.config.ffmpeg_cmd(), "assembling frames")
    }

    fn generate_palette(&self, input: &Path, palette: &Path, cfg: &PaletteConfig) -> Result<()> {
        let filter = format!(
            "fps={},scale=iw:-1:flags={},palettegen=max_colors={}",
            cfg.fps, cfg.scale_flags, cfg.max_colors
        );
        let mut cmd = self.ffmpeg();
        cmd.arg("-i").arg(input).args(["-vf", &filter]).arg(palette);
        run_encoder(&mut cmd, self.config.ffmpeg_cmd(), "generating palette")
    }

    fn apply_palette(&self, input: &Path, palette: &Path, out: &Path, cfg: &PaletteConfig) -> Result<()> {
        let filter = format!("scale=iw:-1:flags={}[x];[x][1:v]paletteuse", cfg.scale_flags);
        let mut cmd = self.ffmpeg();
        cmd.arg("-i")
            .arg(input)
            .arg("-i")
            .arg(palette)
            .args(["-lavfi", &filter, "-f", "gif"])
            .arg(out);
        run_encoder(&mut cmd, self.config.ffmpeg_cmd(), "applying palette")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SequenceKey;

    fn fused(dir: &Path, index: usize, count: usize) -> FusedFrame {
        let key = SequenceKey::new(index, count);
        FusedFrame {
            index,
            key,
            path: dir.join(key.file_name("png")),
        }
    }

    #[test]
    fn overlay_is_transparent_outside_the_bar() {
        let canvas = Canvas::new(10, 4).unwrap();
        let rect = BarRect { x0: 0, y0: 3, x1: 6, y1: 4 };
        let overlay = render_bar_overlay(canvas, rect, BarColor::rgb(1, 2, 3));
        assert_eq!(overlay.dimensions(), (10, 4));
        for (x, y, px) in overlay.enumerate_pixels() {
            if rect.contains(x, y) {
                assert_eq!(*px, Rgba([1, 2, 3, 255]));
            } else {
                assert_eq!(px[3], 0, "({x},{y}) should be transparent");
            }
        }
    }

    #[test]
    fn fusing_keeps_the_source_outside_the_bar() {
        let canvas = Canvas::new(4, 4).unwrap();
        let base = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let rect = BarRect { x0: 0, y0: 0, x1: 2, y1: 1 };
        let fused = fuse_overlay(base, &render_bar_overlay(canvas, rect, BarColor::rgb(200, 0, 0)));
        assert_eq!(*fused.get_pixel(0, 0), Rgba([200, 0, 0, 255]));
        assert_eq!(*fused.get_pixel(1, 0), Rgba([200, 0, 0, 255]));
        assert_eq!(*fused.get_pixel(2, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*fused.get_pixel(0, 1), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn half_transparent_bar_blends() {
        let canvas = Canvas::new(1, 1).unwrap();
        let base = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let rect = BarRect { x0: 0, y0: 0, x1: 1, y1: 1 };
        let color: BarColor = "#ffffff80".parse().unwrap();
        let px = *fuse_overlay(base, &render_bar_overlay(canvas, rect, color)).get_pixel(0, 0);
        assert_eq!(px[3], 255);
        assert!((120..=136).contains(&px[0]), "{px:?}");
    }

    #[test]
    fn opaque_frames_stay_opaque_under_any_bar_alpha() {
        let canvas = Canvas::new(1, 1).unwrap();
        let rect = BarRect { x0: 0, y0: 0, x1: 1, y1: 1 };
        for alpha in 0..=255u8 {
            let base = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
            let color = BarColor { r: 255, g: 255, b: 255, a: alpha };
            let px = *fuse_overlay(base, &render_bar_overlay(canvas, rect, color)).get_pixel(0, 0);
            assert_eq!(px[3], 255, "bar alpha {alpha} left {px:?}");
            assert!(px[0].abs_diff(alpha) <= 1, "bar alpha {alpha} gave {px:?}");
        }
    }

    #[test]
    fn bar_over_transparent_pixel_keeps_its_own_color() {
        let base = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let mut overlay = RgbaImage::new(1, 1);
        overlay.put_pixel(0, 0, Rgba([200, 100, 50, 128]));
        assert_eq!(*fuse_overlay(base, &overlay).get_pixel(0, 0), Rgba([200, 100, 50, 128]));

        let clear = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(*fuse_overlay(clear.clone(), &clear).get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn extracted_frames_sort_by_number_not_text() {
        let mut frames = vec![
            PathBuf::from("x/frame_1000000.png"),
            PathBuf::from("x/frame_999999.png"),
            PathBuf::from("x/frame_000002.png"),
            PathBuf::from("x/frame_100001.png"),
        ];
        sort_by_frame_number(&mut frames);
        assert_eq!(
            frames,
            vec![
                PathBuf::from("x/frame_000002.png"),
                PathBuf::from("x/frame_100001.png"),
                PathBuf::from("x/frame_999999.png"),
                PathBuf::from("x/frame_1000000.png"),
            ]
        );
    }

    #[test]
    fn sequence_pattern_requires_contiguous_frames() {
        let dir = Path::new("/tmp/run/fused");
        let frames: Vec<_> = (0..3).map(|i| fused(dir, i, 3)).collect();
        let (got_dir, pattern) = sequence_pattern(&frames).unwrap();
        assert_eq!(got_dir, dir);
        assert_eq!(pattern, "frame_%05d.png");

        let gap = vec![fused(dir, 0, 3), fused(dir, 2, 3)];
        assert!(matches!(
            sequence_pattern(&gap),
            Err(GifProgressError::EncodingFailure(_))
        ));
        assert!(matches!(
            sequence_pattern(&[]),
            Err(GifProgressError::NoFrames(_))
        ));
    }

    #[test]
    fn missing_tool_is_reported_as_dependency() {
        let backend = FfmpegBackend::new(FfmpegConfig {
            ffmpeg_path: Some("definitely-not-ffmpeg-gif-progress".into()),
            ffprobe_path: None,
        });
        let err = backend.check_dependencies().unwrap_err();
        assert!(matches!(err, GifProgressError::MissingDependency(ref t) if t == "definitely-not-ffmpeg-gif-progress"));
    }

    #[test]
    fn sniffing_a_png_needs_no_external_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 255])).save(&path).unwrap();
        let backend = FfmpegBackend::default();
        assert_eq!(backend.sniff(&path).unwrap(), MediaKind::Image);
        assert_eq!(backend.canvas_of(&path).unwrap(), Canvas::new(3, 2).unwrap());
        assert!(matches!(
            backend.sniff(&dir.path().join("missing.png")),
            Err(GifProgressError::InvalidInputKind(_))
        ));
    }
}
