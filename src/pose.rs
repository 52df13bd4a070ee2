//! Core data model: per-frame pose values and frame records.
//!
//! Positions and directions are three-state values: never computed, explicitly
//! deleted by the user, or a concrete value. The three states survive
//! serialization distinctly (see [`crate::records`]) and must not be conflated.

use crate::geometry::Point;
use crate::{Error, Result};

/// A value that may be unset, deleted, or concrete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Never computed for this frame
    #[default]
    Unset,
    /// Explicitly cleared by user action
    Deleted,
    /// A concrete value
    Value(T),
}

impl<T: Copy> Field<T> {
    /// The concrete value, if any
    #[must_use]
    pub fn value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a concrete value is present
    #[must_use]
    pub fn is_value(self) -> bool {
        matches!(self, Field::Value(_))
    }

    /// Whether the value was explicitly deleted
    #[must_use]
    pub fn is_deleted(self) -> bool {
        matches!(self, Field::Deleted)
    }

    /// Whether the value was never computed
    #[must_use]
    pub fn is_unset(self) -> bool {
        matches!(self, Field::Unset)
    }
}

/// Pose estimate for a single frame
///
/// `direction` is a signed angle in degrees, range (-180, 180], with
/// 0° = right and 90° = up in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pose {
    /// Head position in pixels
    pub head: Field<Point>,
    /// Body/base position in pixels (origin of the head-direction ray)
    pub base: Field<Point>,
    /// Head direction in degrees
    pub direction: Field<i32>,
    /// Head position was set manually
    pub head_manual: bool,
    /// Head direction was set manually
    pub direction_manual: bool,
}

impl Pose {
    /// A pose with every field unset
    #[must_use]
    pub fn unset() -> Self {
        Self::default()
    }

    /// A pose with head, base and direction explicitly deleted and the
    /// manual flags raised (the user cleared this frame)
    #[must_use]
    pub fn deleted() -> Self {
        Self {
            head: Field::Deleted,
            base: Field::Deleted,
            direction: Field::Deleted,
            head_manual: true,
            direction_manual: true,
        }
    }
}

/// One row of the output table: a frame index, its pose and free-text remarks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameRecord {
    /// 0-based frame index
    pub index: usize,
    /// Pose estimate for the frame
    pub pose: Pose,
    /// Free-text remarks
    pub remarks: Option<String>,
}

impl FrameRecord {
    /// An empty record for the given frame
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Validate a manually entered head direction
///
/// # Errors
///
/// Returns `InvalidInput` when the value lies outside (-180, 180].
pub fn validate_manual_direction(deg: i32) -> Result<i32> {
    if deg > -180 && deg <= 180 {
        Ok(deg)
    } else {
        Err(Error::InvalidInput(format!(
            "head direction {deg} outside (-180, 180]"
        )))
    }
}

/// Validate a manually entered position against the frame bounds
///
/// # Errors
///
/// Returns `InvalidInput` when the point lies outside the frame.
pub fn validate_manual_position(pt: Point, width: i32, height: i32) -> Result<Point> {
    if pt.0 >= 0 && pt.0 < width && pt.1 >= 0 && pt.1 < height {
        Ok(pt)
    } else {
        Err(Error::InvalidInput(format!(
            "position ({}, {}) outside {width}x{height} frame",
            pt.0, pt.1
        )))
    }
}
