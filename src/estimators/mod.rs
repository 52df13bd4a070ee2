//! Per-case pose estimators.
//!
//! Each animal experiment case composes the image stages differently, but all
//! share the same finalization policy: disambiguate candidate directions
//! against the previous frame, reject measurements that jump further than the
//! configured tolerance, recompute the head position as a fixed-length ray
//! from the base, and fall back to the previous pose when detection fails
//! outright.

/// Cluster-based estimator (k-means over foreground pixels)
pub mod cluster_based;

/// Color-segmented head/face estimator
pub mod color_marked;

/// Two-blob ear-pair estimator
pub mod ear_pair;

use crate::config::{AnimalCase, DetectionParams};
use crate::geometry::{angle_between, angle_difference, point_from_angle_and_distance, Point};
use crate::pose::{Field, Pose};
use crate::Result;
use opencv::core::Mat;

/// Terminal per-frame state, fed into the next frame as previous context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Fresh measurement accepted without previous-frame context
    /// (first-frame convention)
    NoPriorData,
    /// Fresh measurement accepted against the previous frame
    Detected,
    /// Measurement rejected by the continuity tolerance; previous pose kept
    RejectedKeepPrevious,
    /// Detection failed; previous pose reused
    FallbackKeepPrevious,
    /// Pose supplied or replayed from manual input
    ManualOverride,
    /// Motion gate did not pass; previous pose carried forward
    CarryForwardNoMotion,
    /// No measurement and no previous pose to fall back on
    Unavailable,
}

/// Intermediate images the caller can surface for display
#[derive(Default)]
pub struct Diagnostics {
    /// Grayscale difference / color-mask image
    pub difference: Option<Mat>,
    /// Edge image
    pub edges: Option<Mat>,
}

/// Result of one estimator invocation
pub struct Estimate {
    /// Pose for the current frame
    pub pose: Pose,
    /// How the pose was obtained
    pub state: FrameState,
    /// Intermediate images for display
    pub diagnostics: Diagnostics,
}

/// Inputs shared by every estimator call
pub struct EstimatorContext<'a> {
    /// Current video frame (BGR)
    pub frame: &'a Mat,
    /// Background reference image, when the session has one
    pub background: Option<&'a Mat>,
    /// Previous frame's pose (all-unset for frame 0)
    pub previous: Pose,
}

/// Raw per-frame measurement before the shared finalization policy
pub(crate) enum Detection {
    /// A base position plus two opposite perpendicular direction candidates
    Candidates { base: Point, first: i32, second: i32 },
    /// Measured base and head points; direction follows from the pair
    HeadPoint { base: Point, head: Point },
}

/// Dispatch to the case-specific estimator
///
/// # Errors
///
/// Returns `MissingBackground` when the case requires a background image and
/// none is available, or a `Config` error from the stages; detection
/// insufficiency is resolved internally via the fallback chain.
pub fn estimate(case: &AnimalCase, ctx: &EstimatorContext<'_>) -> Result<Estimate> {
    match case {
        AnimalCase::Marmoset04(params) => ear_pair::estimate(params, ctx),
        AnimalCase::Macaque19(params) => color_marked::estimate(params, ctx),
        AnimalCase::Rat05(params) => cluster_based::estimate(params, ctx),
    }
}

/// Apply the shared continuity/rejection policy to a raw measurement
///
/// `None` means detection failed outright and triggers the fallback chain.
pub(crate) fn finalize(detection: Option<Detection>, previous: Pose, params: &DetectionParams) -> (Pose, FrameState) {
    let Some(detection) = detection else {
        return carry_previous(previous);
    };

    let (base, raw_direction) = match detection {
        Detection::Candidates { base, first, second } => match previous.direction.value() {
            Some(prev_dir) => {
                // pick whichever perpendicular sense is closer to the
                // previous direction
                if angle_difference(prev_dir, first) <= angle_difference(prev_dir, second) {
                    (base, first)
                } else {
                    (base, second)
                }
            }
            None => (base, first),
        },
        Detection::HeadPoint { base, head } => (base, angle_between(base, head)),
    };

    match previous.direction.value() {
        None => (accepted_pose(raw_direction, base, params), FrameState::NoPriorData),
        Some(prev_dir) => {
            if angle_difference(prev_dir, raw_direction) <= params.direction_tolerance_deg {
                (accepted_pose(raw_direction, base, params), FrameState::Detected)
            } else {
                // single-frame jitter/outlier: keep the previous measurement
                let (pose, _) = carry_previous(previous);
                (pose, FrameState::RejectedKeepPrevious)
            }
        }
    }
}

/// Head position as a fixed-length ray from the base along the direction
pub(crate) fn reconcile_head(direction: i32, base: Point, params: &DetectionParams) -> Point {
    point_from_angle_and_distance(direction, f64::from(params.head_line_length), base, true)
}

fn accepted_pose(direction: i32, base: Point, params: &DetectionParams) -> Pose {
    Pose {
        head: Field::Value(reconcile_head(direction, base, params)),
        base: Field::Value(base),
        direction: Field::Value(direction),
        head_manual: false,
        direction_manual: false,
    }
}

/// Reuse the previous frame's pose, or report it unavailable
pub(crate) fn carry_previous(previous: Pose) -> (Pose, FrameState) {
    if previous.direction.is_value() || previous.head.is_value() || previous.base.is_value() {
        let pose = Pose {
            head: previous.head,
            base: previous.base,
            direction: previous.direction,
            head_manual: false,
            direction_manual: false,
        };
        (pose, FrameState::FallbackKeepPrevious)
    } else {
        (Pose::unset(), FrameState::Unavailable)
    }
}
