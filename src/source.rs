//! Input classification and frame ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{MediaBackend, MediaKind};
use crate::error::{GifProgressError, Result};
use crate::timing::FrameRate;

const MIN_KEY_DIGITS: usize = 5;

/// File-name stem for a step, zero-padded so that name order equals step order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub index: usize,
    pub digits: usize,
}

impl SequenceKey {
    /// Key for `index` in a run of `frame_count` frames.
    pub fn new(index: usize, frame_count: usize) -> Self {
        let largest = frame_count.saturating_sub(1);
        let digits = largest.to_string().len().max(MIN_KEY_DIGITS);
        Self { index, digits }
    }

    /// File name for this key with extension `ext`, e.g. `frame_00003.png`.
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}.{}", self, ext)
    }

    /// printf-style pattern matching every key of this width, e.g. `frame_%05d.png`.
    pub fn pattern(&self, ext: &str) -> String {
        format!("frame_%0{}d.{}", self.digits, ext)
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame_{:0width$}", self.index, width = self.digits)
    }
}

/// One ordinal position in the output, tied to its source frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub key: SequenceKey,
    pub source: PathBuf,
}

/// Where the frames came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Images,
    Video,
}

/// Ordered frames to annotate.
#[derive(Debug, Clone)]
pub struct FrameSource {
    pub kind: SourceKind,
    pub steps: Vec<Step>,
    /// Native rate of a video input, when known
    pub frame_rate: Option<FrameRate>,
}

impl FrameSource {
    /// Number of frames, at least one for a resolved source.
    pub fn frame_count(&self) -> usize {
        self.steps.len()
    }

    /// Index of the last step; zero for a single frame.
    pub fn total_steps(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Step that gets the empty bar.
    pub fn first(&self) -> Option<&Step> {
        self.steps.first()
    }

    /// Step that gets the full bar.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }
}

/// Numbers `paths` as steps in the order given.
pub fn steps_from_paths(paths: Vec<PathBuf>) -> Vec<Step> {
    let count = paths.len();
    paths
        .into_iter()
        .enumerate()
        .map(|(index, source)| Step {
            index,
            key: SequenceKey::new(index, count),
            source,
        })
        .collect()
}

/// Classifies `inputs` and produces their frames in rendering order.
///
/// A single input must be a video; its frames are extracted into
/// `extract_dir` (optionally resampled to `fps`). Several inputs must all be
/// images and keep the order they were given in.
#[tracing::instrument(skip(backend))]
pub fn resolve(
    backend: &dyn MediaBackend,
    inputs: &[PathBuf],
    extract_dir: &Path,
    fps: Option<u32>,
) -> Result<FrameSource> {
    match inputs {
        [] => Err(GifProgressError::invalid_input(
            "expected one video or at least two images",
        )),
        [single] => {
            match backend.sniff(single)? {
                MediaKind::Video => {}
                MediaKind::Image => {
                    return Err(GifProgressError::invalid_input(format!(
                        "{} is a single image; pass one video or at least two images",
                        single.display()
                    )))
                }
                MediaKind::Other => {
                    return Err(GifProgressError::invalid_input(format!(
                        "{} is neither a video nor an image",
                        single.display()
                    )))
                }
            }

            let frame_rate = match fps {
                Some(fps) => Some(FrameRate::from_fps(fps)?),
                None => backend.frame_rate(single)?,
            };

            fs::create_dir_all(extract_dir)?;
            let frames = backend.extract_frames(single, extract_dir, fps)?;
            if frames.is_empty() {
                return Err(GifProgressError::no_frames(format!(
                    "no frames could be extracted from {}",
                    single.display()
                )));
            }
            tracing::info!(frames = frames.len(), rate = ?frame_rate, "extracted video frames");

            Ok(FrameSource {
                kind: SourceKind::Video,
                steps: steps_from_paths(frames),
                frame_rate,
            })
        }
        many => {
            for path in many {
                let kind = backend.sniff(path)?;
                if kind != MediaKind::Image {
                    return Err(GifProgressError::invalid_input(format!(
                        "{} is not an image; multiple inputs must all be images",
                        path.display()
                    )));
                }
            }
            tracing::info!(frames = many.len(), "resolved image sequence");

            Ok(FrameSource {
                kind: SourceKind::Images,
                steps: steps_from_paths(many.to_vec()),
                frame_rate: None,
            })
        }
    }
}
