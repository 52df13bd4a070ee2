//! Edge detection and contour summaries.
//!
//! Runs Canny edge detection on a single-channel image, extracts external
//! contours, drops those below the configured minimum size and aggregates the
//! survivors into a combined bounding box.

use crate::geometry::Point;
use crate::Result;
use opencv::core::{self, Mat, Rect, Vector};
use opencv::imgproc;

/// Size and centroid of one retained contour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourSummary {
    /// Bounding-box width + height
    pub size_metric: i32,
    /// Bounding-box center
    pub centroid: Point,
}

/// Aggregated contour information for one image
#[derive(Debug, Clone, Default)]
pub struct ContourData {
    /// One summary per retained contour, in extraction order
    pub summaries: Vec<ContourSummary>,
    /// Boundary pixels of every retained contour, flattened
    pub points: Vec<Point>,
    /// Bounding box enclosing all retained contours (`None` when no contour
    /// survived the size filter)
    pub bounding: Option<Rect>,
    /// Center of the combined bounding box
    pub center: Option<Point>,
}

impl ContourData {
    /// Whether any contour survived the size filter
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Detect edges in a single-channel image with the given hysteresis pair
///
/// # Errors
///
/// Returns an error if the `OpenCV` call fails.
pub fn detect_edges(gray: &Mat, canny_low: i32, canny_high: i32) -> Result<Mat> {
    let mut edged = Mat::default();
    imgproc::canny(gray, &mut edged, f64::from(canny_low), f64::from(canny_high), 3, false)?;
    Ok(edged)
}

/// Extract external contours from an edge image, dropping small ones
///
/// Contours whose bounding-box width + height is below `min_contour_size`
/// are treated as noise. Zero survivors yields a [`ContourData`] with
/// `bounding: None` rather than an ambiguous empty box.
///
/// # Errors
///
/// Returns an error if the `OpenCV` call fails.
pub fn extract_contours(edged: &Mat, min_contour_size: i32) -> Result<ContourData> {
    let mut contours = Vector::<Vector<core::Point>>::new();
    imgproc::find_contours(
        edged,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        core::Point::new(0, 0),
    )?;

    let mut data = ContourData::default();
    let mut combined: Option<Rect> = None;
    for contour in &contours {
        let rect = imgproc::bounding_rect(&contour)?;
        if rect.width + rect.height < min_contour_size {
            continue;
        }
        data.summaries.push(ContourSummary {
            size_metric: rect.width + rect.height,
            centroid: (rect.x + rect.width / 2, rect.y + rect.height / 2),
        });
        for pt in &contour {
            data.points.push((pt.x, pt.y));
        }
        combined = Some(match combined {
            None => rect,
            Some(acc) => {
                let x1 = acc.x.min(rect.x);
                let y1 = acc.y.min(rect.y);
                let x2 = (acc.x + acc.width).max(rect.x + rect.width);
                let y2 = (acc.y + acc.height).max(rect.y + rect.height);
                Rect::new(x1, y1, x2 - x1, y2 - y1)
            }
        });
    }

    data.bounding = combined;
    data.center = combined.map(|b| (b.x + b.width / 2, b.y + b.height / 2));
    Ok(data)
}
