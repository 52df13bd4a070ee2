//! Image-processing stages composed by the per-case pose estimators.
//!
//! Every stage is a pure function of its inputs. Detection insufficiency
//! (nothing found) is reported as a structured "no result" value, never as an
//! error; only configuration problems (dimension mismatches, malformed
//! ranges) return `Err`.

/// Background subtraction and foreground-mask extraction
pub mod background;

/// Color-range masks and image-moment centroids
pub mod color;

/// K-means localization of head and body clusters
pub mod cluster;

/// Edge detection and contour summaries
pub mod contours;
