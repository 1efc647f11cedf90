//! FFI functions for radial reduction and automatic Guinier fits.

use std::ffi::c_char;

use ndarray::{Array2, ArrayView2};

use super::curve::{c_str, CurveHandle};
use super::types::{CGuinierFit, SaxsStatus};
use crate::analysis::GuinierRangeFinder;
use crate::mask::PixelMask;
use crate::reduce::{BeamCenter, RadialReducer, ReduceConfig};

/// Run the Guinier search with default settings.
///
/// A result with `rg == -1` means no Guinier region was found; the status is
/// still `Ok`.
///
/// # Safety
/// Handle and output pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn saxs_auto_rg(handle: CurveHandle, out_fit: *mut CGuinierFit) -> SaxsStatus {
    if handle.is_null() || out_fit.is_null() {
        return SaxsStatus::NullPointer;
    }
    *out_fit = GuinierRangeFinder::with_defaults().find(&*handle).into();
    SaxsStatus::Ok
}

/// Reduce a row-major `rows x cols` image into a new curve.
///
/// `mask` is optional (null for none); non-zero entries mark usable pixels.
/// The beam centre is given as column `center_x`, row `center_y`.
///
/// # Safety
/// `image` must hold `rows * cols` values, `mask` (when not null) as many
/// bytes. Caller must free the result with `saxs_curve_free`.
#[no_mangle]
pub unsafe extern "C" fn saxs_radial_reduce(
    image: *const f64,
    mask: *const u8,
    rows: usize,
    cols: usize,
    center_x: f64,
    center_y: f64,
    dezinger: bool,
    label: *const c_char,
    out_handle: *mut CurveHandle,
) -> SaxsStatus {
    if image.is_null() || out_handle.is_null() {
        return SaxsStatus::NullPointer;
    }
    let label = match c_str(label) {
        Ok(s) => s,
        Err(status) => return status,
    };
    let Some(len) = rows.checked_mul(cols) else {
        return SaxsStatus::InvalidArgument;
    };

    let pixels = std::slice::from_raw_parts(image, len);
    let view = match ArrayView2::from_shape((rows, cols), pixels) {
        Ok(v) => v,
        Err(_) => return SaxsStatus::LengthMismatch,
    };
    let pixel_mask = if mask.is_null() {
        None
    } else {
        let bytes = std::slice::from_raw_parts(mask, len);
        match Array2::from_shape_vec((rows, cols), bytes.iter().map(|b| *b != 0).collect()) {
            Ok(grid) => Some(PixelMask::from_array(grid)),
            Err(_) => return SaxsStatus::LengthMismatch,
        }
    };

    let reducer = RadialReducer::new(ReduceConfig {
        dezinger,
        ..ReduceConfig::default()
    });
    match reducer.reduce(view, BeamCenter::new(center_x, center_y), pixel_mask.as_ref(), None) {
        Ok(profile) => {
            *out_handle = Box::into_raw(Box::new(profile.into_curve(label)));
            SaxsStatus::Ok
        }
        Err(e) => SaxsStatus::from(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::curve::{saxs_curve_create, saxs_curve_free, saxs_curve_len};
    use std::ffi::CString;

    #[test]
    fn test_auto_rg_through_handle() {
        let q: Vec<f64> = (1..=100).map(|k| 0.001 * k as f64).collect();
        let i: Vec<f64> = q.iter().map(|v| 200.0 * (-v * v * 900.0 / 3.0f64).exp()).collect();
        let e = vec![1.0; 100];
        let label = CString::new("g").unwrap();
        unsafe {
            let mut h: CurveHandle = std::ptr::null_mut();
            assert_eq!(
                saxs_curve_create(label.as_ptr(), q.as_ptr(), i.as_ptr(), e.as_ptr(), 100, &mut h),
                SaxsStatus::Ok
            );
            let mut fit = CGuinierFit::from(crate::analysis::GuinierFit::not_found());
            assert_eq!(saxs_auto_rg(h, &mut fit), SaxsStatus::Ok);
            assert!((fit.rg - 30.0).abs() < 0.3);
            saxs_curve_free(h);
        }
    }

    #[test]
    fn test_radial_reduce_with_mask() {
        let (rows, cols) = (40usize, 40usize);
        let image = vec![3.0; rows * cols];
        let mut mask = vec![1u8; rows * cols];
        mask[0] = 0;
        let label = CString::new("frame").unwrap();
        unsafe {
            let mut h: CurveHandle = std::ptr::null_mut();
            let status = saxs_radial_reduce(
                image.as_ptr(),
                mask.as_ptr(),
                rows,
                cols,
                20.0,
                20.0,
                false,
                label.as_ptr(),
                &mut h,
            );
            assert_eq!(status, SaxsStatus::Ok);
            assert!(saxs_curve_len(h) > 0);
            assert_eq!((*h).label(), "frame");
            assert!((*h).i()[3..10].iter().all(|v| (*v - 3.0).abs() < 1e-12));
            saxs_curve_free(h);

            let blank = vec![0u8; rows * cols];
            let status = saxs_radial_reduce(
                image.as_ptr(),
                blank.as_ptr(),
                rows,
                cols,
                20.0,
                20.0,
                false,
                label.as_ptr(),
                &mut h,
            );
            assert_eq!(status, SaxsStatus::NoUsablePixels);
        }
    }
}
