//! C-compatible type definitions for FFI.

use crate::analysis::GuinierFit;
use crate::error::SaxsError;

/// Result status codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaxsStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer was passed.
    NullPointer = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Array length mismatch.
    LengthMismatch = 3,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 4,
    /// Curves cannot be combined without forcing.
    DataNotCompatible = 5,
    /// Index window out of bounds.
    RangeError = 6,
    /// Mask and image shapes differ.
    MaskSizeError = 7,
    /// No usable pixel after masking.
    NoUsablePixels = 8,
    /// Empty list of curves.
    EmptyCurveList = 9,
    /// External program missing.
    ExternalToolUnavailable = 10,
    /// External program failed.
    ExternalToolFailed = 11,
    /// File could not be read, written or parsed.
    IoError = 12,
}

impl From<&SaxsError> for SaxsStatus {
    fn from(err: &SaxsError) -> Self {
        match err {
            SaxsError::DataNotCompatible(_) => SaxsStatus::DataNotCompatible,
            SaxsError::Range { .. } => SaxsStatus::RangeError,
            SaxsError::MaskSize { .. } => SaxsStatus::MaskSizeError,
            SaxsError::ExternalToolUnavailable(_) => SaxsStatus::ExternalToolUnavailable,
            SaxsError::ExternalToolFailed(_) => SaxsStatus::ExternalToolFailed,
            SaxsError::NoUsablePixels => SaxsStatus::NoUsablePixels,
            SaxsError::EmptyCurveList => SaxsStatus::EmptyCurveList,
            SaxsError::LengthMismatch { .. } => SaxsStatus::LengthMismatch,
            SaxsError::InvalidParameter { .. }
            | SaxsError::NoWeighting
            | SaxsError::MissingCounter { .. } => SaxsStatus::InvalidArgument,
            SaxsError::Format { .. } | SaxsError::Io(_) | SaxsError::Json(_) => SaxsStatus::IoError,
        }
    }
}

impl<T> From<&crate::error::Result<T>> for SaxsStatus {
    fn from(result: &crate::error::Result<T>) -> Self {
        match result {
            Ok(_) => SaxsStatus::Ok,
            Err(e) => e.into(),
        }
    }
}

/// C-compatible array view (pointer + length).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CArrayView {
    pub data: *const f64,
    pub len: usize,
}

impl CArrayView {
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null(),
            len: 0,
        }
    }

    pub fn of(values: &[f64]) -> Self {
        Self {
            data: values.as_ptr(),
            len: values.len(),
        }
    }
}

/// C-compatible Guinier fit. `rg == -1` means no Guinier region was found.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CGuinierFit {
    pub rg: f64,
    pub rg_err: f64,
    pub i0: f64,
    pub i0_err: f64,
    pub q_index_min: i64,
    pub q_index_max: i64,
    pub quality: f64,
}

impl From<GuinierFit> for CGuinierFit {
    fn from(fit: GuinierFit) -> Self {
        Self {
            rg: fit.rg,
            rg_err: fit.rg_err,
            i0: fit.i0,
            i0_err: fit.i0_err,
            q_index_min: fit.q_index_min,
            q_index_max: fit.q_index_max,
            quality: fit.quality,
        }
    }
}
