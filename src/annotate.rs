//! On-frame annotation of pose results and status messages.
//!
//! All drawing happens on a display copy selected from the current frame or
//! one of the estimator's diagnostic images; the frame used for motion
//! comparison is never touched.

use crate::constants::{
    BANNER_LINE_SPACING, HEAD_LINE_THICKNESS, HEAD_MARKER_RADIUS, STATUS_FONT_SCALE, STATUS_TEXT_ORIGIN,
};
use crate::estimators::Diagnostics;
use crate::pose::{Field, Pose};
use crate::Result;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{self, FONT_HERSHEY_DUPLEX, LINE_8};
use opencv::prelude::*;

/// Which diagnostic image variant to return for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// The color frame itself
    #[default]
    Normal,
    /// Grayscale difference / color-mask image
    Difference,
    /// Grayscale edge image
    Edges,
}

impl DisplayMode {
    /// Parse a CLI display-mode name
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "normal" | "rgb" => Ok(DisplayMode::Normal),
            "diff" | "difference" => Ok(DisplayMode::Difference),
            "edge" | "edges" => Ok(DisplayMode::Edges),
            other => Err(crate::Error::InvalidInput(format!("unknown display mode {other:?}"))),
        }
    }
}

/// Build the display image for the chosen mode
///
/// Falls back to the color frame when the requested diagnostic was not
/// produced this frame (e.g. the estimator did not run).
///
/// # Errors
///
/// Returns an error if an `OpenCV` conversion fails.
pub fn select_display(frame: &Mat, diagnostics: &Diagnostics, mode: DisplayMode) -> Result<Mat> {
    let gray = match mode {
        DisplayMode::Normal => None,
        DisplayMode::Difference => diagnostics.difference.as_ref(),
        DisplayMode::Edges => diagnostics.edges.as_ref(),
    };
    match gray {
        Some(gray) => {
            let mut display = Mat::default();
            imgproc::cvt_color(gray, &mut display, imgproc::COLOR_GRAY2BGR, 0)?;
            Ok(display)
        }
        None => Ok(frame.clone()),
    }
}

/// Draw the head-direction line and head marker when the pose has them
///
/// # Errors
///
/// Returns an error if a drawing call fails.
pub fn draw_pose(display: &mut Mat, pose: &Pose) -> Result<()> {
    let (Some(head), Some(base), true) = (pose.head.value(), pose.base.value(), pose.direction.is_value()) else {
        return Ok(());
    };
    let head = Point::new(head.0, head.1);
    let base = Point::new(base.0, base.1);
    imgproc::line(
        display,
        head,
        base,
        Scalar::new(0.0, 255.0, 0.0, 0.0),
        HEAD_LINE_THICKNESS,
        LINE_8,
        0,
    )?;
    imgproc::circle(
        display,
        head,
        HEAD_MARKER_RADIUS,
        Scalar::new(0.0, 125.0, 255.0, 0.0),
        imgproc::FILLED,
        LINE_8,
        0,
    )?;
    Ok(())
}

fn direction_text(pose: &Pose) -> String {
    match pose.direction {
        Field::Unset => "None".to_string(),
        Field::Deleted => "D".to_string(),
        Field::Value(deg) => deg.to_string(),
    }
}

/// Draw the frame-index / head-direction status line
///
/// # Errors
///
/// Returns an error if the text call fails.
pub fn draw_status(display: &mut Mat, frame_index: usize, frame_count: usize, pose: &Pose) -> Result<()> {
    let last = frame_count.saturating_sub(1);
    let status = format!("{frame_index}/ {last}, HD {}", direction_text(pose));
    imgproc::put_text(
        display,
        &status,
        Point::new(STATUS_TEXT_ORIGIN.0, STATUS_TEXT_ORIGIN.1),
        FONT_HERSHEY_DUPLEX,
        STATUS_FONT_SCALE,
        Scalar::new(0.0, 250.0, 0.0, 0.0),
        2,
        LINE_8,
        false,
    )?;
    Ok(())
}

/// Draw the banner explaining that a required background image is missing
///
/// # Errors
///
/// Returns an error if a text call fails.
pub fn draw_missing_background(display: &mut Mat) -> Result<()> {
    let lines = [
        "This algorithm requires a background image.",
        "Background file, [video-file-name]_bg.jpg,",
        " is NOT found.",
    ];
    let mut ty = 100;
    for line in lines {
        imgproc::put_text(
            display,
            line,
            Point::new(10, ty),
            FONT_HERSHEY_DUPLEX,
            STATUS_FONT_SCALE,
            Scalar::new(0.0, 250.0, 0.0, 0.0),
            2,
            LINE_8,
            false,
        )?;
        ty += BANNER_LINE_SPACING;
    }
    Ok(())
}
