//! Two-blob ear-pair estimator.
//!
//! The subject's ears show up as the two largest motion contours against the
//! background. The base position is the midpoint of the ear-to-ear line and
//! the head direction is perpendicular to it, in whichever of the two
//! opposite senses lies closer to the previous frame's direction.

use crate::config::EarPairParams;
use crate::geometry::{angle_between, distance, normalize_degrees, point_from_angle_and_distance};
use crate::stages::{background, contours};
use crate::{Error, Result};

use super::{finalize, Detection, Diagnostics, Estimate, EstimatorContext};

/// Estimate the pose from a pair of ear contours
///
/// # Errors
///
/// Returns `MissingBackground` when no background image is loaded, or a
/// `Config` error when the background does not match the frame.
pub fn estimate(params: &EarPairParams, ctx: &EstimatorContext<'_>) -> Result<Estimate> {
    let background_img = ctx.background.ok_or(Error::MissingBackground)?;
    let det = &params.detection;

    let diff = background::subtract_background(ctx.frame, background_img, det)?;
    let edged = contours::detect_edges(&diff.mask, det.canny_low, det.canny_high)?;
    let contour_data = contours::extract_contours(&edged, det.min_contour_size)?;

    let detection = ear_pair_detection(&contour_data);
    let (pose, state) = finalize(detection, ctx.previous, det);

    Ok(Estimate {
        pose,
        state,
        diagnostics: Diagnostics {
            difference: Some(diff.gray),
            edges: Some(edged),
        },
    })
}

/// Take the two largest contours as ear markers and derive the base position
/// and the two perpendicular direction candidates
fn ear_pair_detection(contour_data: &contours::ContourData) -> Option<Detection> {
    if contour_data.summaries.len() < 2 {
        return None;
    }
    let mut summaries = contour_data.summaries.clone();
    summaries.sort_by(|a, b| b.size_metric.cmp(&a.size_metric));

    // left ear sits closer to the left side of the screen
    let mut left = summaries[0].centroid;
    let mut right = summaries[1].centroid;
    if left.0 > right.0 {
        std::mem::swap(&mut left, &mut right);
    }

    let ear_angle = angle_between(left, right);
    let half_length = distance(left, right) / 2.0;
    let base = point_from_angle_and_distance(ear_angle, half_length, left, true);

    Some(Detection::Candidates {
        base,
        first: normalize_degrees(ear_angle + 90),
        second: normalize_degrees(ear_angle - 90),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::contours::{ContourData, ContourSummary};

    fn data_with_ears(left: (i32, i32), right: (i32, i32)) -> ContourData {
        ContourData {
            summaries: vec![
                ContourSummary {
                    size_metric: 40,
                    centroid: left,
                },
                ContourSummary {
                    size_metric: 38,
                    centroid: right,
                },
                // smaller noise contour that must be ignored
                ContourSummary {
                    size_metric: 12,
                    centroid: (0, 0),
                },
            ],
            ..ContourData::default()
        }
    }

    fn candidates(detection: Option<Detection>) -> ((i32, i32), i32, i32) {
        match detection {
            Some(Detection::Candidates { base, first, second }) => (base, first, second),
            _ => panic!("expected a candidate detection"),
        }
    }

    #[test]
    fn test_horizontal_ears() {
        let (base, first, second) = candidates(ear_pair_detection(&data_with_ears((100, 100), (140, 100))));
        assert_eq!(base, (120, 100));
        assert_eq!(first, 90);
        assert_eq!(second, -90);
    }

    #[test]
    fn test_vertical_ears() {
        // ears stacked vertically: the ear line points straight down from
        // the left-ordered point, candidates are horizontal
        let (base, first, second) = candidates(ear_pair_detection(&data_with_ears((100, 100), (100, 140))));
        assert_eq!(base, (100, 120));
        assert_eq!(first, 0);
        assert_eq!(second, 180);
    }

    #[test]
    fn test_seam_crossing_candidates_stay_in_range() {
        // a slightly tilted ear line pushes one candidate across +-180
        let (_, first, second) = candidates(ear_pair_detection(&data_with_ears((100, 100), (140, 104))));
        for candidate in [first, second] {
            assert!(candidate > -180 && candidate <= 180, "candidate {candidate}");
        }
        // the two candidates stay opposite
        assert_eq!(crate::geometry::angle_difference(first, second), 180);
    }

    #[test]
    fn test_left_right_swap_is_stable() {
        // the same geometry regardless of which ear contour is larger
        let a = candidates(ear_pair_detection(&data_with_ears((140, 100), (100, 100))));
        let b = candidates(ear_pair_detection(&data_with_ears((100, 100), (140, 100))));
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_fewer_than_two_contours_is_no_detection() {
        let data = ContourData {
            summaries: vec![ContourSummary {
                size_metric: 40,
                centroid: (10, 10),
            }],
            ..ContourData::default()
        };
        assert!(ear_pair_detection(&data).is_none());
        assert!(ear_pair_detection(&ContourData::default()).is_none());
    }
}
