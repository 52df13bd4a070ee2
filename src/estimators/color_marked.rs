//! Color-segmented head/face estimator.
//!
//! The subject's head and face are distinguished by color rather than motion
//! contrast. An ambient screen visible at the frame edge periodically shifts
//! the apparent head/face colors, so the estimator first samples the screen
//! color and selects between two HSV range sets before locating the head
//! (base position) and the face (head position) by mask centroids.

use crate::config::ColorMarkedParams;
use crate::constants::{PANEL_SEARCH_WIDTH_RATIO, SCREEN_SAMPLE_MARGIN};
use crate::stages::{color, contours};
use crate::Result;
use opencv::core::{self, Mat, Rect};
use opencv::prelude::*;

use super::{finalize, Detection, Diagnostics, Estimate, EstimatorContext};

/// Estimate the pose from head- and face-color centroids
///
/// # Errors
///
/// Returns an error if an `OpenCV` operation fails.
pub fn estimate(params: &ColorMarkedParams, ctx: &EstimatorContext<'_>) -> Result<Estimate> {
    let size = ctx.frame.size()?;
    let active = screen_state_active(params, ctx.frame, size.height)?;
    log::debug!("ambient screen state active: {active}");

    let (detection, diagnostics) = detect(params, ctx.frame, size.width, size.height, active)?;
    let (pose, state) = finalize(detection, ctx.previous, &params.detection);

    Ok(Estimate {
        pose,
        state,
        diagnostics,
    })
}

/// Sample the ambient screen color; inside the configured hue/sat bands the
/// subject's head and face take their alternate colors
fn screen_state_active(params: &ColorMarkedParams, frame: &Mat, height: i32) -> Result<bool> {
    let sample_pt = (SCREEN_SAMPLE_MARGIN, height / 2);
    let info = color::sample_color_info(frame, sample_pt, SCREEN_SAMPLE_MARGIN)?;
    Ok(params.screen_hue_band.0 < info.hue_median
        && info.hue_median < params.screen_hue_band.1
        && params.screen_sat_band.0 < info.sat_median
        && info.sat_median < params.screen_sat_band.1)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn detect(
    params: &ColorMarkedParams,
    frame: &Mat,
    width: i32,
    height: i32,
    active: bool,
) -> Result<(Option<Detection>, Diagnostics)> {
    let det = &params.detection;

    // approximate panel area bounding the subject
    let panel_mask = color::find_color(frame, Rect::new(0, 0, width, height), &params.panel)?;
    let edged = contours::detect_edges(&panel_mask, det.canny_low, det.canny_high)?;
    let contour_data = contours::extract_contours(&edged, det.min_contour_size)?;
    let (Some(panel_box), Some(panel_center)) = (contour_data.bounding, contour_data.center) else {
        let diagnostics = Diagnostics {
            difference: Some(panel_mask),
            edges: Some(edged),
        };
        return Ok((None, diagnostics));
    };
    let panel_right = panel_box.x + panel_box.width;
    let search_x = panel_right - (f64::from(height) * PANEL_SEARCH_WIDTH_RATIO) as i32;
    let search = Rect::new(
        search_x,
        panel_center.1 - height / 4,
        panel_right - search_x,
        height / 2,
    );

    // head color centroid -> base position
    let head_range = if active { &params.head_active } else { &params.head_normal };
    let head_mask = color::find_color(frame, search, head_range)?;
    let Some(base) = color::mask_centroid(&head_mask)? else {
        let diagnostics = Diagnostics {
            difference: Some(head_mask),
            edges: Some(edged),
        };
        return Ok((None, diagnostics));
    };

    // face color centroid inside the head region -> head position
    let half = (f64::from(height) * params.head_region_size_ratio / 2.0) as i32;
    let head_rect = Rect::new(base.0 - half, base.1 - half, 2 * half, 2 * half);
    let mut face_mask = color::find_color(frame, head_rect, &params.face_normal)?;
    if active {
        // the secondary face color briefly replaces the normal one; union
        // both masks
        let secondary = color::find_color(frame, head_rect, &params.face_active)?;
        let mut merged = Mat::default();
        core::add(&face_mask, &secondary, &mut merged, &core::no_array(), -1)?;
        face_mask = merged;
    }
    let head = color::mask_centroid(&face_mask)?;

    let diagnostics = Diagnostics {
        difference: Some(face_mask),
        edges: Some(edged),
    };
    Ok((head.map(|head| Detection::HeadPoint { base, head }), diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HsvRange;
    use opencv::core::{Scalar, CV_8UC3};

    /// Synthetic scene: bluish panel strip, brownish "head" patch and a
    /// reddish "face" patch on its upper edge
    fn scene(active_screen: bool) -> Mat {
        let mut frame = Mat::new_rows_cols_with_default(240, 320, CV_8UC3, Scalar::all(0.0)).unwrap();
        let fill = |frame: &mut Mat, rect: Rect, bgr: (f64, f64, f64)| {
            frame
                .roi_mut(rect)
                .unwrap()
                .set_to(&Scalar::new(bgr.0, bgr.1, bgr.2, 0.0), &core::no_array())
                .unwrap();
        };
        // screen color sample area at the left edge
        if active_screen {
            // HSV approx (115, 45, ...): a muted blue
            fill(&mut frame, Rect::new(0, 100, 20, 40), (200.0, 170.0, 165.0));
        }
        // panel: muted blue, HSV ~(99, 145, 140) inside the panel range
        fill(&mut frame, Rect::new(60, 60, 200, 120), (140.0, 115.0, 60.0));
        // head: brownish-red, HSV ~(5, 200, 100)
        fill(&mut frame, Rect::new(180, 100, 40, 40), (25.0, 45.0, 100.0));
        // face: saturated red above the head patch, HSV ~(0, 230, 200)
        fill(&mut frame, Rect::new(190, 80, 20, 20), (20.0, 20.0, 200.0));
        frame
    }

    fn test_params() -> ColorMarkedParams {
        ColorMarkedParams {
            head_normal: HsvRange::new([0, 100, 30], [20, 255, 150]),
            face_normal: HsvRange::new([0, 180, 150], [10, 255, 255]),
            ..ColorMarkedParams::default()
        }
    }

    #[test]
    fn test_detects_base_and_head_positions() {
        let frame = scene(false);
        let (detection, _) = detect(&test_params(), &frame, 320, 240, false).unwrap();
        let Some(Detection::HeadPoint { base, head }) = detection else {
            panic!("expected a head-point detection");
        };
        // base near the head-patch center, head near the face patch
        assert!((base.0 - 200).abs() <= 6 && (base.1 - 120).abs() <= 8, "base {base:?}");
        assert!((head.0 - 200).abs() <= 6 && (head.1 - 90).abs() <= 6, "head {head:?}");
    }

    #[test]
    fn test_no_face_color_is_no_detection() {
        let mut params = test_params();
        // a face range matching nothing in the scene
        params.face_normal = HsvRange::new([60, 200, 200], [70, 255, 255]);
        let frame = scene(false);
        let (detection, diagnostics) = detect(&params, &frame, 320, 240, false).unwrap();
        assert!(detection.is_none());
        assert!(diagnostics.difference.is_some());
    }

    #[test]
    fn test_screen_state_sampling() {
        let params = test_params();
        let inactive = scene(false);
        assert!(!screen_state_active(&params, &inactive, 240).unwrap());
        let active = scene(true);
        assert!(screen_state_active(&params, &active, 240).unwrap());
    }
}
