use std::path::PathBuf;

use crate::backend::MediaBackend;
use crate::compositor::{composite_all, CompositeJob};
use crate::config::PaletteConfig;
use crate::encoder::{self, Artifact, OutputKind};
use crate::error::{GifProgressError, Result};
use crate::source::{resolve, SourceKind};
use crate::timing::FrameRate;
use crate::{AnnotateOptions, Progress};

/// Resolve, composite and encode in one go.
///
/// Scratch files live in a temp dir removed on every exit path. When the
/// cancel token fires, whatever error an interrupted step produced is
/// reported as `Cancelled`.
pub fn run<F>(
    backend: &dyn MediaBackend,
    inputs: &[PathBuf],
    options: &AnnotateOptions,
    palette: &PaletteConfig,
    progress: F,
) -> Result<Artifact>
where
    F: Fn(Progress) + Send + Sync,
{
    let cancel = options.cancel.clone();
    run_inner(backend, inputs, options, palette, &progress).map_err(|e| {
        if cancel.is_cancelled() {
            GifProgressError::Cancelled
        } else {
            e
        }
    })
}

fn run_inner<F>(
    backend: &dyn MediaBackend,
    inputs: &[PathBuf],
    options: &AnnotateOptions,
    palette: &PaletteConfig,
    progress: &F,
) -> Result<Artifact>
where
    F: Fn(Progress) + Send + Sync,
{
    let bar = options.bar_spec()?;
    let images_rate = FrameRate::from_delay(options.delay)?;
    let cancel = &options.cancel;

    let workdir = tempfile::Builder::new().prefix("gif-progress-").tempdir()?;
    tracing::debug!(workdir = %workdir.path().display(), "created scratch space");

    progress(Progress::resolving_inputs());
    if inputs.len() == 1 {
        progress(Progress::extracting_frames());
    }
    let source = resolve(backend, inputs, &workdir.path().join("extracted"), options.fps)?;
    cancel.check()?;

    let first = source
        .first()
        .ok_or_else(|| GifProgressError::no_frames("no input frames"))?;
    let canvas = backend.canvas_of(&first.source)?;
    let rate = match source.kind {
        SourceKind::Images => images_rate,
        SourceKind::Video => source.frame_rate.unwrap_or(images_rate),
    };
    tracing::info!(
        %canvas,
        frames = source.frame_count(),
        %rate,
        "compositing progress bar"
    );

    let fused_dir = workdir.path().join("fused");
    let job = CompositeJob {
        canvas,
        bar: &bar,
        color: options.bar_color,
        out_dir: &fused_dir,
    };
    progress(Progress::compositing_frames(0, source.frame_count()));
    let fused = composite_all(backend, &job, &source.steps, cancel, |done, total| {
        progress(Progress::compositing_frames(done, total))
    })?;
    cancel.check()?;

    progress(Progress::encoding(OutputKind::from_path(&options.output)));
    let artifact = encoder::encode(
        backend,
        &fused,
        rate,
        &options.output,
        &workdir.path().join("encode"),
        palette,
    )?;

    progress(Progress::complete(artifact.frame_count));
    Ok(artifact)
}
