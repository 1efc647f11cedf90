//! FFI functions for curve manipulation and curve algebra.

use std::ffi::{c_char, CStr};

use super::types::{CArrayView, SaxsStatus};
use crate::algebra::{average, subtract};
use crate::data::Curve;
use crate::io::{load_dat, save_dat};

/// Opaque handle to a Curve.
pub type CurveHandle = *mut Curve;

/// Borrow a C string as UTF-8.
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char) -> Result<&'a str, SaxsStatus> {
    if ptr.is_null() {
        return Err(SaxsStatus::NullPointer);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| SaxsStatus::InvalidUtf8)
}

unsafe fn store(result: crate::error::Result<Curve>, out_handle: *mut CurveHandle) -> SaxsStatus {
    match result {
        Ok(curve) => {
            *out_handle = Box::into_raw(Box::new(curve));
            SaxsStatus::Ok
        }
        Err(e) => SaxsStatus::from(&e),
    }
}

/// Create a new curve from raw arrays.
///
/// # Safety
/// All pointers must be valid and arrays must have `len` elements.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_create(
    label: *const c_char,
    q_values: *const f64,
    intensity: *const f64,
    intensity_err: *const f64,
    len: usize,
    out_handle: *mut CurveHandle,
) -> SaxsStatus {
    if q_values.is_null() || intensity.is_null() || intensity_err.is_null() || out_handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    let label = match c_str(label) {
        Ok(s) => s,
        Err(status) => return status,
    };

    let q = std::slice::from_raw_parts(q_values, len).to_vec();
    let i = std::slice::from_raw_parts(intensity, len).to_vec();
    let e = std::slice::from_raw_parts(intensity_err, len).to_vec();
    store(Curve::new(label, q, i, e), out_handle)
}

/// Free a curve handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_free(handle: CurveHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Number of points in the selected range.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_len(handle: CurveHandle) -> usize {
    if handle.is_null() {
        return 0;
    }
    (*handle).q().len()
}

/// Active q over the selected range.
///
/// # Safety
/// Handle must be valid. Returned view is valid until the curve is modified or freed.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_get_q(handle: CurveHandle) -> CArrayView {
    if handle.is_null() {
        return CArrayView::empty();
    }
    CArrayView::of((*handle).q())
}

/// Active intensity over the selected range.
///
/// # Safety
/// Handle must be valid. Returned view is valid until the curve is modified or freed.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_get_intensity(handle: CurveHandle) -> CArrayView {
    if handle.is_null() {
        return CArrayView::empty();
    }
    CArrayView::of((*handle).i())
}

/// Active error over the selected range.
///
/// # Safety
/// Handle must be valid. Returned view is valid until the curve is modified or freed.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_get_err(handle: CurveHandle) -> CArrayView {
    if handle.is_null() {
        return CArrayView::empty();
    }
    CArrayView::of((*handle).err())
}

/// Replace the scale factor.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_set_scale(handle: CurveHandle, factor: f64) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    (*handle).set_scale(factor);
    SaxsStatus::Ok
}

/// Replace the additive offset.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_set_offset(handle: CurveHandle, offset: f64) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    (*handle).set_offset(offset);
    SaxsStatus::Ok
}

/// Replace the normalization divisor.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_normalize(handle: CurveHandle, norm: f64) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    SaxsStatus::from(&(*handle).set_norm(norm))
}

/// Replace the q scale factor.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_set_q_scale(handle: CurveHandle, factor: f64) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    (*handle).set_q_scale(factor);
    SaxsStatus::Ok
}

/// Select binned points `[start, end)`.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_set_q_range(handle: CurveHandle, start: usize, end: usize) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    SaxsStatus::from(&(*handle).set_q_range(start, end))
}

/// Rebin the raw data into groups of `bin_size` points.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_set_binning(handle: CurveHandle, bin_size: usize) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    SaxsStatus::from(&(*handle).set_binning(bin_size))
}

/// Undo binning, selection and all transforms.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_reset(handle: CurveHandle) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    (*handle).reset();
    SaxsStatus::Ok
}

/// Subtract `buffer` from `sample` into a new curve.
///
/// # Safety
/// Handles must be valid. Caller must free the result with `saxs_curve_free`.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_subtract(
    sample: CurveHandle,
    buffer: CurveHandle,
    forced: bool,
    out_handle: *mut CurveHandle,
) -> SaxsStatus {
    if sample.is_null() || buffer.is_null() || out_handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    store(subtract(&*sample, &*buffer, forced), out_handle)
}

/// Average `count` curves into a new curve.
///
/// # Safety
/// `handles` must point to `count` valid handles. Caller must free the
/// result with `saxs_curve_free`.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_average(
    handles: *const CurveHandle,
    count: usize,
    forced: bool,
    out_handle: *mut CurveHandle,
) -> SaxsStatus {
    if handles.is_null() || out_handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    let handles = std::slice::from_raw_parts(handles, count);
    if handles.iter().any(|h| h.is_null()) {
        return SaxsStatus::NullPointer;
    }
    let curves: Vec<&Curve> = handles.iter().map(|h| &**h).collect();
    store(average(&curves, forced), out_handle)
}

/// Load a `.dat` curve file.
///
/// # Safety
/// `path` must be a valid C string. Caller must free the result with `saxs_curve_free`.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_load(path: *const c_char, out_handle: *mut CurveHandle) -> SaxsStatus {
    if out_handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    match c_str(path) {
        Ok(path) => store(load_dat(path), out_handle),
        Err(status) => status,
    }
}

/// Save the selected range of a curve as a `.dat` file.
///
/// # Safety
/// Handle and `path` must be valid.
#[no_mangle]
pub unsafe extern "C" fn saxs_curve_save(handle: CurveHandle, path: *const c_char) -> SaxsStatus {
    if handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    match c_str(path) {
        Ok(path) => SaxsStatus::from(&save_dat(path, &*handle)),
        Err(status) => status,
    }
}
