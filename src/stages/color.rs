//! Color-region stage.
//!
//! Finds pixels within an inclusive HSV range inside a rectangular search
//! area and locates the region by its image first-moment centroid. Used for
//! subjects whose anatomy is distinguished by color rather than motion
//! contrast.

use crate::config::HsvRange;
use crate::geometry::Point;
use crate::Result;
use opencv::core::{self, Mat, Rect, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

/// Binary mask of pixels within `range`, restricted to `search_rect`
///
/// The search rect is clamped to the image bounds; the returned mask has the
/// full image size with zeros outside the search area.
///
/// # Errors
///
/// Returns an error if an `OpenCV` operation fails.
pub fn find_color(image: &Mat, search_rect: Rect, range: &HsvRange) -> Result<Mat> {
    let size = image.size()?;
    let x1 = search_rect.x.max(0);
    let y1 = search_rect.y.max(0);
    let x2 = (search_rect.x + search_rect.width).min(size.width);
    let y2 = (search_rect.y + search_rect.height).min(size.height);

    let mut area_mask = Mat::new_rows_cols_with_default(size.height, size.width, core::CV_8UC1, Scalar::all(0.0))?;
    if x2 > x1 && y2 > y1 {
        imgproc::rectangle(
            &mut area_mask,
            Rect::new(x1, y1, x2 - x1, y2 - y1),
            Scalar::all(255.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
    }
    let mut masked = Mat::default();
    core::bitwise_and(image, image, &mut masked, &area_mask)?;

    let mut hsv = Mat::default();
    imgproc::cvt_color(&masked, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;
    let lower = Scalar::new(f64::from(range.min[0]), f64::from(range.min[1]), f64::from(range.min[2]), 0.0);
    let upper = Scalar::new(f64::from(range.max[0]), f64::from(range.max[1]), f64::from(range.max[2]), 0.0);
    let mut in_range = Mat::default();
    core::in_range(&hsv, &lower, &upper, &mut in_range)?;

    let mut mask = Mat::default();
    imgproc::threshold(&in_range, &mut mask, 50.0, 255.0, imgproc::THRESH_BINARY)?;
    Ok(mask)
}

/// Centroid of a binary mask via image first moments
///
/// Returns `None` when the mask has zero total mass; callers must treat that
/// as "no detection", never as a (0, 0) position.
///
/// # Errors
///
/// Returns an error if the moments computation fails.
#[allow(clippy::cast_possible_truncation)]
pub fn mask_centroid(mask: &Mat) -> Result<Option<Point>> {
    let m = imgproc::moments(mask, true)?;
    if m.m00 > 0.0 {
        Ok(Some(((m.m10 / m.m00) as i32, (m.m01 / m.m00) as i32)))
    } else {
        Ok(None)
    }
}

/// Median and standard deviation of H, S and V around a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorInfo {
    /// Median hue
    pub hue_median: i32,
    /// Median saturation
    pub sat_median: i32,
    /// Median value
    pub val_median: i32,
    /// Hue standard deviation
    pub hue_std: i32,
    /// Saturation standard deviation
    pub sat_std: i32,
    /// Value standard deviation
    pub val_std: i32,
}

/// Sample HSV statistics in a `(2*margin+1)`-sided square around `pt`
///
/// Used to read the ambient screen color that shifts the subject's apparent
/// head/face color between frames.
///
/// # Errors
///
/// Returns an error if the sample area falls outside the image.
#[allow(clippy::cast_possible_truncation)]
pub fn sample_color_info(image: &Mat, pt: Point, margin: i32) -> Result<ColorInfo> {
    let rect = Rect::new(pt.0 - margin, pt.1 - margin, 2 * margin + 1, 2 * margin + 1);
    let roi = Mat::roi(image, rect)?.try_clone()?;
    let mut hsv = Mat::default();
    imgproc::cvt_color(&roi, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;

    let mut channels: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for row in 0..hsv.rows() {
        for col in 0..hsv.cols() {
            let px = hsv.at_2d::<core::Vec3b>(row, col)?;
            for ch in 0..3 {
                channels[ch].push(f64::from(px[ch]));
            }
        }
    }

    let stats: Vec<(i32, i32)> = channels
        .iter_mut()
        .map(|values| {
            values.sort_by(|a, b| a.partial_cmp(b).expect("HSV samples are finite"));
            let median = values[values.len() / 2];
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (median as i32, variance.sqrt() as i32)
        })
        .collect();

    Ok(ColorInfo {
        hue_median: stats[0].0,
        sat_median: stats[1].0,
        val_median: stats[2].0,
        hue_std: stats[0].1,
        sat_std: stats[1].1,
        val_std: stats[2].1,
    })
}
