use thiserror::Error;

/// Errors raised by the overlay pipeline and the synchronizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    #[error("shape error: declared {rows}x{cols} field needs {expected} samples, got {actual}")]
    FieldShape {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    #[error("shape error: field declared as {rows}x{cols}, sensor is configured for {expected_rows}x{expected_cols}")]
    UnexpectedShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("shape error: field has no samples")]
    EmptyField,

    #[error("shape error: cannot resample onto a {width}x{height} grid")]
    InvalidTarget { width: usize, height: usize },

    #[error("shape error: base frame is {base_width}x{base_height}, overlay is {overlay_width}x{overlay_height}")]
    FrameMismatch {
        base_width: usize,
        base_height: usize,
        overlay_width: usize,
        overlay_height: usize,
    },

    #[error("frame buffer holds {actual} bytes, {width}x{height} at {bytes_per_pixel} bytes/pixel needs {expected}")]
    FrameBuffer {
        width: usize,
        height: usize,
        bytes_per_pixel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("synchronizer is already running")]
    AlreadyRunning,

    #[error("synchronizer has been stopped")]
    Stopped,

    #[error("failed to spawn driver thread: {0}")]
    Spawn(String),
}

impl OverlayError {
    /// True for declared-vs-actual size mismatches, which point at a
    /// misconfigured producer rather than a transient condition.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            OverlayError::FieldShape { .. }
                | OverlayError::UnexpectedShape { .. }
                | OverlayError::EmptyField
                | OverlayError::InvalidTarget { .. }
                | OverlayError::FrameMismatch { .. }
                | OverlayError::FrameBuffer { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
