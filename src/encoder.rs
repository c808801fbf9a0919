use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::MediaBackend;
use crate::compositor::FusedFrame;
use crate::config::PaletteConfig;
use crate::error::{GifProgressError, Result};
use crate::timing::FrameRate;

/// How the final artifact is produced, decided by the output extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// `.mov`: frames go straight into the container
    Mov,
    /// anything else: intermediate MOV, then two-pass palette GIF
    PaletteGif,
}

impl OutputKind {
    /// `.mov` in any case is `Mov`; every other path is a GIF.
    pub fn from_path(path: &Path) -> Self {
        let is_mov = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mov"));
        if is_mov {
            Self::Mov
        } else {
            Self::PaletteGif
        }
    }
}

/// The encoded output; owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: OutputKind,
    pub frame_count: usize,
}

/// Encodes `frames` (in slice order) into `output`.
///
/// All intermediate files live in `scratch_dir`. The artifact is staged there
/// too and only moved to `output` once every encoder pass has succeeded.
#[tracing::instrument(skip(backend, frames, palette), fields(frames = frames.len()))]
pub fn encode(
    backend: &dyn MediaBackend,
    frames: &[FusedFrame],
    rate: FrameRate,
    output: &Path,
    scratch_dir: &Path,
    palette: &PaletteConfig,
) -> Result<Artifact> {
    if frames.is_empty() {
        return Err(GifProgressError::no_frames("nothing to encode"));
    }
    fs::create_dir_all(scratch_dir)?;

    let kind = OutputKind::from_path(output);
    let staged = match kind {
        OutputKind::Mov => {
            let staged = scratch_dir.join("artifact.mov");
            backend.encode(frames, rate, &staged)?;
            staged
        }
        OutputKind::PaletteGif => {
            let intermediate = scratch_dir.join("intermediate.mov");
            backend.encode(frames, rate, &intermediate)?;
            let staged = scratch_dir.join("artifact.gif");
            backend.quantize(&intermediate, scratch_dir, &staged, palette)?;
            staged
        }
    };

    publish(&staged, output)?;
    tracing::info!(output = %output.display(), ?kind, "wrote artifact");

    Ok(Artifact {
        path: output.to_path_buf(),
        kind,
        frame_count: frames.len(),
    })
}

/// Moves `staged` to `output` without ever exposing a half-written file there.
fn publish(staged: &Path, output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    if fs::rename(staged, output).is_ok() {
        return Ok(());
    }

    // scratch space on another filesystem: copy next to the output, then rename
    let tmp = tempfile::Builder::new()
        .prefix(".gif-progress-")
        .tempfile_in(&parent)?;
    fs::copy(staged, tmp.path())?;
    tmp.persist(output).map_err(|e| GifProgressError::Io(e.error))?;
    Ok(())
}
