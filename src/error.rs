//! Error taxonomy shared by every component of the crate.

use thiserror::Error;

/// Errors raised by reduction, curve algebra and analysis.
#[derive(Error, Debug)]
pub enum SaxsError {
    /// Two or more curves cannot be combined without an explicit override.
    #[error("curves are not compatible: {0}")]
    DataNotCompatible(String),

    /// A selected index window lies outside the curve.
    #[error("q-range ({start}, {end}) is out of bounds for a curve of length {len}")]
    Range { start: usize, end: usize, len: usize },

    /// Mask and image dimensions disagree.
    #[error("mask shape {mask:?} does not match image shape {image:?}")]
    MaskSize {
        mask: (usize, usize),
        image: (usize, usize),
    },

    /// The external PDDF program could not be located or started.
    #[error("external tool unavailable: {0}")]
    ExternalToolUnavailable(String),

    /// The external PDDF program ran but produced no usable result.
    #[error("external tool failed: {0}")]
    ExternalToolFailed(String),

    /// The mask leaves no pixel to reduce.
    #[error("no usable pixels after masking")]
    NoUsablePixels,

    /// An operation over several curves received none.
    #[error("empty curve list")]
    EmptyCurveList,

    /// Array lengths don't match.
    #[error("array length mismatch: q={q_len}, intensity={intensity_len}, err={err_len}")]
    LengthMismatch {
        q_len: usize,
        intensity_len: usize,
        err_len: usize,
    },

    /// A numeric parameter is outside its valid domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Weighted averaging was requested with neither weighting source enabled.
    #[error("weighted average needs error weighting or a counter name")]
    NoWeighting,

    /// A curve lacks the counter selected for weighting.
    #[error("curve `{label}` has no counter `{counter}`")]
    MissingCounter { label: String, counter: String },

    /// A curve file could not be parsed.
    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SaxsError>;

impl SaxsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SaxsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
