use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, GifProgressError>;

#[derive(thiserror::Error, Debug)]
pub enum GifProgressError {
    #[error("invalid input: {0}")]
    InvalidInputKind(String),

    #[error("missing dependency: `{0}` not found in PATH")]
    MissingDependency(String),

    #[error("frame extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("encoding failed: {0}")]
    EncodingFailure(String),

    #[error("frame {index} ({}) is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}", path.display())]
    CanvasMismatch {
        index: usize,
        path: PathBuf,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("no frames to process: {0}")]
    NoFrames(String),

    #[error("invalid bar color \"{0}\"")]
    InvalidColor(String),

    #[error("invalid bar settings: {0}")]
    InvalidBarSpec(String),

    #[error("invalid frame delay: {0}")]
    InvalidDelay(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("interrupted")]
    Cancelled,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GifProgressError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInputKind(msg.into())
    }

    pub fn missing_dependency(tool: impl Into<String>) -> Self {
        Self::MissingDependency(tool.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailure(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }

    pub fn no_frames(msg: impl Into<String>) -> Self {
        Self::NoFrames(msg.into())
    }

    pub fn bar_spec(msg: impl Into<String>) -> Self {
        Self::InvalidBarSpec(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(GifProgressError::invalid_input("x")
            .to_string()
            .starts_with("invalid input:"));
        assert!(GifProgressError::encoding("x")
            .to_string()
            .starts_with("encoding failed:"));
        assert_eq!(
            GifProgressError::missing_dependency("ffmpeg").to_string(),
            "missing dependency: `ffmpeg` not found in PATH"
        );
    }

    #[test]
    fn canvas_mismatch_names_the_frame() {
        let err = GifProgressError::CanvasMismatch {
            index: 2,
            path: PathBuf::from("c.png"),
            expected_width: 100,
            expected_height: 80,
            actual_width: 90,
            actual_height: 80,
        };
        assert_eq!(
            err.to_string(),
            "frame 2 (c.png) is 90x80, expected 100x80"
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = GifProgressError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_cancelled());
        assert!(GifProgressError::Cancelled.is_cancelled());
    }
}
