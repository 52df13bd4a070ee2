//! Cluster-based estimator.
//!
//! Foreground pixels from background subtraction are partitioned into k
//! clusters. An anchor point projected ahead of the subject along the
//! previous frame's direction marks the head-ward side: the cluster nearest
//! the anchor is the head, the cluster nearest the head is the body/base.

use crate::config::ClusterParams;
use crate::geometry::{distance, point_from_angle_and_distance, Point};
use crate::stages::{background, cluster, contours};
use crate::{Error, Result};

use super::{carry_previous, finalize, Detection, Diagnostics, Estimate, EstimatorContext};

/// Estimate the pose by clustering foreground pixels
///
/// Without a previous direction there is no anchor to orient the clusters,
/// so the first measurable frame must come from manual input or a later
/// detection; until then the estimator falls back.
///
/// # Errors
///
/// Returns `MissingBackground` when no background image is loaded, or a
/// `Config` error when the background does not match the frame.
pub fn estimate(params: &ClusterParams, ctx: &EstimatorContext<'_>) -> Result<Estimate> {
    let background_img = ctx.background.ok_or(Error::MissingBackground)?;
    let det = &params.detection;

    let diff = background::subtract_background(ctx.frame, background_img, det)?;
    let edged = contours::detect_edges(&diff.mask, det.canny_low, det.canny_high)?;
    let contour_data = contours::extract_contours(&edged, det.min_contour_size)?;

    let diagnostics = Diagnostics {
        difference: Some(diff.gray.clone()),
        edges: Some(edged),
    };

    let (Some(prev_direction), Some(prev_base)) = (ctx.previous.direction.value(), ctx.previous.base.value()) else {
        let (pose, state) = carry_previous(ctx.previous);
        return Ok(Estimate {
            pose,
            state,
            diagnostics,
        });
    };
    let Some(bounding) = contour_data.bounding else {
        let (pose, state) = carry_previous(ctx.previous);
        return Ok(Estimate {
            pose,
            state,
            diagnostics,
        });
    };

    // project an anchor one subject-length ahead of the previous base
    let reach = bounding.width.max(bounding.height);
    let anchor = point_from_angle_and_distance(prev_direction, f64::from(reach), prev_base, true);

    let points = cluster::foreground_points(&diff.mask)?;
    let detection = locate(&points, params.cluster_count, anchor)?;
    let (pose, state) = finalize(detection, ctx.previous, det);

    Ok(Estimate {
        pose,
        state,
        diagnostics,
    })
}

/// Run the cluster stage and pick the head pixel and base centroid
fn locate(points: &[Point], cluster_count: usize, anchor: Point) -> Result<Option<Detection>> {
    let Some(result) = cluster::cluster_by_anchor(points, cluster_count, anchor)? else {
        return Ok(None);
    };

    // head position: the head-cluster pixel nearest the anchor
    let head = result
        .cluster_points(points, 0)
        .min_by(|a, b| {
            distance(*a, anchor)
                .partial_cmp(&distance(*b, anchor))
                .expect("distances are finite")
        });
    let (Some(head), Some(body_index)) = (head, result.body_index) else {
        return Ok(None);
    };
    let base = result.centroids[body_index];

    Ok(Some(Detection::HeadPoint { base, head }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionParams;
    use crate::estimators::FrameState;
    use crate::pose::{Field, Pose};
    use opencv::core::{self, Mat, Rect, Scalar, CV_8UC3};
    use opencv::prelude::*;

    fn blank_frame() -> Mat {
        Mat::new_rows_cols_with_default(200, 300, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    /// Frame with white blobs over a black background
    fn frame_with_blobs(blobs: &[Rect]) -> Mat {
        let mut frame = blank_frame();
        for rect in blobs {
            frame
                .roi_mut(*rect)
                .unwrap()
                .set_to(&Scalar::all(255.0), &core::no_array())
                .unwrap();
        }
        frame
    }

    fn test_params() -> ClusterParams {
        ClusterParams {
            detection: DetectionParams {
                morph_open_iterations: None,
                morph_close_iterations: None,
                binarize_threshold: Some(50),
                min_contour_size: 5,
                direction_tolerance_deg: 90,
                head_line_length: 30,
                ..DetectionParams::default()
            },
            cluster_count: 2,
        }
    }

    fn previous_pose(direction: i32, base: (i32, i32)) -> Pose {
        Pose {
            head: Field::Value(base),
            base: Field::Value(base),
            direction: Field::Value(direction),
            head_manual: false,
            direction_manual: false,
        }
    }

    #[test]
    fn test_missing_background_is_distinct_error() {
        let frame = blank_frame();
        let ctx = EstimatorContext {
            frame: &frame,
            background: None,
            previous: Pose::unset(),
        };
        let err = estimate(&test_params(), &ctx).unwrap_err();
        assert!(matches!(err, Error::MissingBackground));
    }

    #[test]
    fn test_no_previous_direction_falls_back() {
        let background = blank_frame();
        let frame = frame_with_blobs(&[Rect::new(100, 90, 20, 20)]);
        let ctx = EstimatorContext {
            frame: &frame,
            background: Some(&background),
            previous: Pose::unset(),
        };
        let result = estimate(&test_params(), &ctx).unwrap();
        assert_eq!(result.state, FrameState::Unavailable);
        assert!(result.pose.direction.is_unset());
    }

    #[test]
    fn test_two_blob_subject_oriented_by_anchor() {
        let background = blank_frame();
        // head blob to the right, body blob to the left
        let frame = frame_with_blobs(&[Rect::new(200, 90, 16, 16), Rect::new(120, 90, 24, 24)]);
        let ctx = EstimatorContext {
            frame: &frame,
            background: Some(&background),
            // previously looking right from between the blobs
            previous: previous_pose(0, (160, 98)),
        };
        let result = estimate(&test_params(), &ctx).unwrap();
        assert_eq!(result.state, FrameState::Detected);
        let direction = result.pose.direction.value().unwrap();
        // head cluster sits to the right of the body cluster
        assert!(direction.abs() <= 20, "direction {direction}");
        let base = result.pose.base.value().unwrap();
        assert!((base.0 - 131).abs() <= 4, "base {base:?}");
    }

    #[test]
    fn test_insufficient_foreground_falls_back() {
        let background = blank_frame();
        let frame = blank_frame();
        let prev = previous_pose(45, (150, 100));
        let ctx = EstimatorContext {
            frame: &frame,
            background: Some(&background),
            previous: prev,
        };
        let result = estimate(&test_params(), &ctx).unwrap();
        assert_eq!(result.state, FrameState::FallbackKeepPrevious);
        assert_eq!(result.pose.direction, Field::Value(45));
    }
}
