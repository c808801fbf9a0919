//! End-to-end runs against the real ffmpeg; skipped when it is not installed.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use gif_progress::{AnnotateOptions, BarColor, BarPosition, OutputKind, ProgressAnnotator};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Rgba, RgbaImage};

fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

fn decode_gif(path: &Path) -> Vec<RgbaImage> {
    let decoder = GifDecoder::new(BufReader::new(File::open(path).unwrap())).unwrap();
    decoder
        .into_frames()
        .collect_frames()
        .unwrap()
        .into_iter()
        .map(|f| f.into_buffer())
        .collect()
}

fn is_reddish(px: &Rgba<u8>) -> bool {
    px[0] > 200 && px[1] < 80 && px[2] < 80
}

fn slides(dir: &Path) -> Vec<PathBuf> {
    let backgrounds = [[20u8, 20, 220], [20, 200, 20], [230, 230, 230]];
    backgrounds
        .iter()
        .enumerate()
        .map(|(i, rgb)| {
            let p = dir.join(format!("slide_{i}.png"));
            RgbaImage::from_pixel(64, 48, Rgba([rgb[0], rgb[1], rgb[2], 255]))
                .save(&p)
                .unwrap();
            p
        })
        .collect()
}

#[test]
fn gif_keeps_frame_count_and_order() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let inputs = slides(dir.path());
    let output = dir.path().join("slides.gif");
    let options = AnnotateOptions::default()
        .with_bar_color(BarColor::rgb(255, 0, 0))
        .with_bar_height(25.0)
        .with_bar_position(BarPosition::Bottom)
        .with_delay(0.5)
        .with_output(&output);

    let artifact = ProgressAnnotator::new().annotate(&inputs, &options).unwrap();
    assert_eq!(artifact.kind, OutputKind::PaletteGif);

    let frames = decode_gif(&output);
    assert_eq!(frames.len(), 3);

    let bottom = 47;
    // first frame: no bar, the blue background shows through
    assert!(!is_reddish(frames[0].get_pixel(0, bottom)));
    assert!(frames[0].get_pixel(0, bottom)[2] > 150);
    // middle frame: left half only
    assert!(is_reddish(frames[1].get_pixel(0, bottom)));
    assert!(!is_reddish(frames[1].get_pixel(63, bottom)));
    // last frame: full width, but not above the band
    assert!(is_reddish(frames[2].get_pixel(63, bottom)));
    assert!(!is_reddish(frames[2].get_pixel(63, 0)));
}

#[test]
fn video_input_produces_one_frame_per_extracted_frame() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mkv");
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x48:rate=10:duration=1",
            "-c:v",
            "ffv1",
        ])
        .arg(&video)
        .status()
        .unwrap();
    assert!(status.success(), "ffmpeg failed creating the test clip");

    let output = dir.path().join("clip.gif");
    let options = AnnotateOptions::default().with_output(&output);
    let artifact = ProgressAnnotator::new().annotate(&[video], &options).unwrap();

    assert_eq!(artifact.frame_count, 10);
    assert_eq!(decode_gif(&output).len(), 10);
}

#[test]
fn mov_output_is_written_directly() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let inputs = slides(dir.path());
    let output = dir.path().join("slides.mov");
    let options = AnnotateOptions::default().with_output(&output);

    let artifact = ProgressAnnotator::new().annotate(&inputs, &options).unwrap();
    assert_eq!(artifact.kind, OutputKind::Mov);

    let probe = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-count_frames",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=nb_read_frames",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(&output)
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&probe.stdout).trim(), "3");
}
