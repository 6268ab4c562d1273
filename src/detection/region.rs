//! Helpers shared by the extraction strategies: input checks, masking,
//! cropping and area accounting.

use opencv::{
    core::{Mat, Rect, Scalar, CV_8UC1, CV_8UC4},
    imgproc::{cvt_color, COLOR_BGR2BGRA, COLOR_BGR2GRAY, COLOR_BGR2HSV, COLOR_BGRA2BGR},
    prelude::*,
};

use crate::constants::MAX_AREA_PERCENT;
use crate::{AnalysisError, Result};

/// Ensure `image` is a non-empty color image and return it as 3-channel BGR
pub fn require_bgr(image: &Mat) -> Result<Mat> {
    if image.empty() || image.rows() == 0 || image.cols() == 0 {
        return Err(AnalysisError::ProcessingError(
            "Cannot extract a region from an empty image".into(),
        ));
    }

    match image.channels() {
        3 => image
            .try_clone()
            .map_err(|e| AnalysisError::opencv("image clone", e)),
        4 => {
            let mut bgr = Mat::default();
            cvt_color(
                image,
                &mut bgr,
                COLOR_BGRA2BGR,
                0,
                opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
            )
            .map_err(|e| AnalysisError::opencv("BGRA to BGR conversion", e))?;
            Ok(bgr)
        }
        n => Err(AnalysisError::ProcessingError(format!(
            "Expected a BGR image, got {} channel(s)",
            n
        ))),
    }
}

pub fn to_gray(bgr: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    cvt_color(
        bgr,
        &mut gray,
        COLOR_BGR2GRAY,
        0,
        opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| AnalysisError::opencv("grayscale conversion", e))?;
    Ok(gray)
}

pub fn to_hsv(bgr: &Mat) -> Result<Mat> {
    let mut hsv = Mat::default();
    cvt_color(
        bgr,
        &mut hsv,
        COLOR_BGR2HSV,
        0,
        opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| AnalysisError::opencv("HSV conversion", e))?;
    Ok(hsv)
}

/// Single-channel all-zero mask of the given size
pub fn empty_mask(rows: i32, cols: i32) -> Result<Mat> {
    Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(0.0))
        .map_err(|e| AnalysisError::opencv("mask allocation", e))
}

/// Copy `bgr` into a BGRA image that is opaque inside `mask` and
/// transparent black elsewhere
pub fn apply_alpha_mask(bgr: &Mat, mask: &Mat) -> Result<Mat> {
    let mut bgra = Mat::default();
    cvt_color(
        bgr,
        &mut bgra,
        COLOR_BGR2BGRA,
        0,
        opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| AnalysisError::opencv("BGR to BGRA conversion", e))?;

    let mut masked =
        Mat::new_rows_cols_with_default(bgr.rows(), bgr.cols(), CV_8UC4, Scalar::all(0.0))
            .map_err(|e| AnalysisError::opencv("region allocation", e))?;
    bgra.copy_to_masked(&mut masked, mask)
        .map_err(|e| AnalysisError::opencv("masked copy", e))?;
    Ok(masked)
}

/// Rectangle spanning `[x0, x1) x [y0, y1)` clamped to a `cols x rows` image.
///
/// Returns `None` when nothing of the rectangle lies inside the image.
pub fn clamp_rect(x0: i32, y0: i32, x1: i32, y1: i32, cols: i32, rows: i32) -> Option<Rect> {
    let left = x0.max(0);
    let top = y0.max(0);
    let right = x1.min(cols);
    let bottom = y1.min(rows);

    if right <= left || bottom <= top {
        None
    } else {
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Owned copy of the `rect` sub-image
pub fn crop(image: &Mat, rect: Rect) -> Result<Mat> {
    Mat::roi(image, rect)
        .map_err(|e| AnalysisError::opencv("region of interest", e))?
        .try_clone()
        .map_err(|e| AnalysisError::opencv("crop copy", e))
}

/// Percent of a `rows x cols` image covered by `area` pixels, capped at 100
pub fn area_percent(area: f64, rows: i32, cols: i32) -> f64 {
    let image_area = rows as f64 * cols as f64;
    if image_area <= 0.0 {
        return 0.0;
    }
    (100.0 * area / image_area).min(MAX_AREA_PERCENT)
}
