use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::MediaBackend;
use crate::color::BarColor;
use crate::error::{GifProgressError, Result};
use crate::geometry::{bar_rect, BarSpec, Canvas};
use crate::source::{SequenceKey, Step};

/// A source frame with the bar composited on, written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusedFrame {
    pub index: usize,
    pub key: SequenceKey,
    pub path: PathBuf,
}

/// Shared flag that stops a run between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token; every clone sees it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Cancelled` once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GifProgressError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a single step needs, shared read-only across workers.
#[derive(Debug, Clone, Copy)]
pub struct CompositeJob<'a> {
    pub canvas: Canvas,
    pub bar: &'a BarSpec,
    pub color: BarColor,
    pub out_dir: &'a Path,
}

/// Renders and fuses one step.
///
/// The overlay buffer and output file are private to the step, so steps can
/// run in any order on any thread.
pub fn composite_step(
    backend: &dyn MediaBackend,
    job: &CompositeJob<'_>,
    step: &Step,
    total_steps: usize,
) -> Result<FusedFrame> {
    let frame_canvas = backend.canvas_of(&step.source)?;
    if frame_canvas != job.canvas {
        return Err(GifProgressError::CanvasMismatch {
            index: step.index,
            path: step.source.clone(),
            expected_width: job.canvas.width,
            expected_height: job.canvas.height,
            actual_width: frame_canvas.width,
            actual_height: frame_canvas.height,
        });
    }

    let rect = bar_rect(job.canvas, job.bar, step.index, total_steps);
    let overlay = backend.render_rect(job.canvas, rect, job.color)?;
    let path = job.out_dir.join(step.key.file_name("png"));
    backend.composite(&step.source, &overlay, &path)?;
    tracing::debug!(step = step.index, bar_width = rect.width(), out = %path.display(), "fused frame");

    Ok(FusedFrame {
        index: step.index,
        key: step.key,
        path,
    })
}

/// Fuses every step in parallel; the result is in step order.
///
/// `on_frame` is called with `(completed, total)` as frames finish, in
/// completion order. The first failure aborts the remaining steps.
pub fn composite_all<F>(
    backend: &dyn MediaBackend,
    job: &CompositeJob<'_>,
    steps: &[Step],
    cancel: &CancelToken,
    on_frame: F,
) -> Result<Vec<FusedFrame>>
where
    F: Fn(usize, usize) + Send + Sync,
{
    fs::create_dir_all(job.out_dir)?;
    let total = steps.len();
    let total_steps = total.saturating_sub(1);
    let completed = AtomicUsize::new(0);

    let fused: Vec<FusedFrame> = steps
        .par_iter()
        .map(|step| -> Result<FusedFrame> {
            cancel.check()?;
            let frame = composite_step(backend, job, step, total_steps)?;
            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_frame(current, total);
            Ok(frame)
        })
        .collect::<Result<Vec<_>>>()?;

    debug_assert!(fused.iter().enumerate().all(|(i, f)| f.index == i));
    Ok(fused)
}
