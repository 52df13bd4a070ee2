//! Planar geometry helpers shared by the pose estimators.
//!
//! All angles are signed degrees in the range (-180, 180], with 0° pointing
//! right and 90° pointing up. Screen coordinates are y-down, so "up" means a
//! decreasing y; functions taking a `screen_space` flag invert the y term
//! accordingly.

/// A 2-D integer point in pixel coordinates
pub type Point = (i32, i32);

/// Normalize a degree value into the range (-180, 180]
#[must_use]
pub fn normalize_degrees(deg: i32) -> i32 {
    let mut d = deg.rem_euclid(360);
    if d > 180 {
        d -= 360;
    }
    d
}

/// Angle of the line from `p1` to `p2`, in integer degrees
///
/// Screen y is inverted so that a point above the origin yields a positive
/// angle. The fractional part is truncated toward zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // truncation is the angle convention
pub fn angle_between(p1: Point, p2: Point) -> i32 {
    let dx = f64::from(p2.0 - p1.0);
    let dy = f64::from(p2.1 - p1.1);
    (-dy).atan2(dx).to_degrees() as i32
}

/// Shortest circular distance between two angles in (-180, 180]
///
/// Always non-negative and at most 180.
#[must_use]
pub fn angle_difference(a1: i32, a2: i32) -> i32 {
    if (a1 >= 0) == (a2 >= 0) {
        (a1 - a2).abs()
    } else {
        let ad1 = a1.abs() + a2.abs();
        let ad2 = (180 - a1.abs()) + (180 - a2.abs());
        ad1.min(ad2)
    }
}

/// Point at `dist` pixels from `origin` along `angle_deg`
///
/// With `screen_space` the y axis is inverted (y decreases upward on screen).
/// Coordinates are truncated toward zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn point_from_angle_and_distance(angle_deg: i32, dist: f64, origin: Point, screen_space: bool) -> Point {
    let rad = f64::from(angle_deg).to_radians();
    let x = f64::from(origin.0) + dist * rad.cos();
    let y = if screen_space {
        f64::from(origin.1) - dist * rad.sin()
    } else {
        f64::from(origin.1) + dist * rad.sin()
    };
    (x as i32, y as i32)
}

/// Rotate `pt` counter-clockwise by `deg` around `center` in a y-down frame
///
/// The result is rounded to the nearest integer.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rotate_point(pt: Point, center: Point, deg: i32) -> Point {
    let rad = f64::from(deg).to_radians();
    let tx = f64::from(pt.0 - center.0);
    let ty = f64::from(pt.1 - center.1);
    let x = tx * rad.cos() + ty * rad.sin() + f64::from(center.0);
    let y = -tx * rad.sin() + ty * rad.cos() + f64::from(center.1);
    (x.round() as i32, y.round() as i32)
}

/// Distance from `pt` to the line through `line.0` and `line.1`
///
/// With `clamp_to_ends` the distance is measured to the nearest point on the
/// segment rather than the infinite line. A zero-length segment reduces to
/// the point-to-point distance.
#[must_use]
pub fn point_to_line_distance(pt: (f64, f64), line: ((f64, f64), (f64, f64)), clamp_to_ends: bool) -> f64 {
    let (lp1, lp2) = line;
    let ldx = lp2.0 - lp1.0;
    let ldy = lp2.1 - lp1.1;
    let sq_len = ldx * ldx + ldy * ldy;
    if sq_len == 0.0 {
        // line is a point
        return ((pt.0 - lp1.0).powi(2) + (pt.1 - lp1.1).powi(2)).sqrt();
    }
    let u = ((pt.0 - lp1.0) * ldx + (pt.1 - lp1.1) * ldy) / sq_len;
    let (x, y) = if clamp_to_ends && u < 0.0 {
        lp1
    } else if clamp_to_ends && u > 1.0 {
        lp2
    } else {
        (lp1.0 + u * ldx, lp1.1 + u * ldy)
    };
    ((pt.0 - x).powi(2) + (pt.1 - y).powi(2)).sqrt()
}

/// Euclidean distance between two integer points
#[must_use]
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = f64::from(p1.0 - p2.0);
    let dy = f64::from(p1.1 - p2.1);
    (dx * dx + dy * dy).sqrt()
}
