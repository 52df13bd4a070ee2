//! Cluster-based localization stage.
//!
//! Partitions foreground pixel coordinates into k clusters and assigns
//! head/body roles by proximity to a directional anchor point: the cluster
//! nearest the anchor is the head cluster, and among the remaining clusters
//! the one nearest the head cluster is the body cluster.

use crate::geometry::{distance, Point};
use crate::utils::usize_to_i32;
use crate::Result;
use opencv::core::{self, Mat, TermCriteria};
use opencv::prelude::*;

/// K-means attempts per clustering call
const KMEANS_ATTEMPTS: i32 = 3;
/// Iteration cap of one k-means attempt
const KMEANS_MAX_ITER: i32 = 20;
/// Convergence epsilon of one k-means attempt
const KMEANS_EPSILON: f64 = 1.0;
/// Fixed RNG seed so identical inputs cluster identically across replays
const KMEANS_SEED: i32 = 7;

/// Result of clustering a foreground pixel set
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    /// Cluster centroids ordered by ascending distance to the anchor;
    /// index 0 is the head cluster
    pub centroids: Vec<Point>,
    /// Index into `centroids` of the body cluster (`None` when k == 1)
    pub body_index: Option<usize>,
    /// For each input pixel, the index of its centroid in `centroids`
    pub assignments: Vec<usize>,
}

impl ClusterResult {
    /// Pixels assigned to the cluster at `index`
    pub fn cluster_points<'a>(&'a self, points: &'a [Point], index: usize) -> impl Iterator<Item = Point> + 'a {
        points
            .iter()
            .zip(&self.assignments)
            .filter(move |(_, &assigned)| assigned == index)
            .map(|(&pt, _)| pt)
    }
}

/// Coordinates of all foreground (255) pixels in a binary mask
///
/// # Errors
///
/// Returns an error if pixel access fails.
pub fn foreground_points(mask: &Mat) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    for row in 0..mask.rows() {
        for col in 0..mask.cols() {
            if *mask.at_2d::<u8>(row, col)? == 255 {
                points.push((col, row));
            }
        }
    }
    Ok(points)
}

/// Cluster `points` into `k` groups and order them by distance to `anchor`
///
/// Returns `Ok(None)` when the pixel set is empty or smaller than `k`
/// (insufficient data); the caller falls back to the previous frame's pose.
///
/// # Errors
///
/// Returns an error if the `OpenCV` k-means call fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn cluster_by_anchor(points: &[Point], k: usize, anchor: Point) -> Result<Option<ClusterResult>> {
    if points.is_empty() || points.len() < k {
        return Ok(None);
    }

    let mut samples = Mat::zeros(usize_to_i32(points.len())?, 2, core::CV_32F)?.to_mat()?;
    for (i, pt) in points.iter().enumerate() {
        let row = usize_to_i32(i)?;
        *samples.at_2d_mut::<f32>(row, 0)? = pt.0 as f32;
        *samples.at_2d_mut::<f32>(row, 1)? = pt.1 as f32;
    }

    // reseed per call: replaying the same sequence must reproduce the same
    // centroids
    core::set_rng_seed(KMEANS_SEED)?;
    let mut labels = Mat::default();
    let mut centers = Mat::default();
    let criteria = TermCriteria::new(
        core::TermCriteria_COUNT + core::TermCriteria_EPS,
        KMEANS_MAX_ITER,
        KMEANS_EPSILON,
    )?;
    core::kmeans(
        &samples,
        k as i32,
        &mut labels,
        criteria,
        KMEANS_ATTEMPTS,
        core::KMEANS_PP_CENTERS,
        &mut centers,
    )?;

    let mut centroids: Vec<Point> = Vec::with_capacity(k);
    for i in 0..centers.rows() {
        let cx = *centers.at_2d::<f32>(i, 0)?;
        let cy = *centers.at_2d::<f32>(i, 1)?;
        centroids.push((cx as i32, cy as i32));
    }
    // nearest-to-anchor first; stable sort keeps first-encountered on ties
    centroids.sort_by(|a, b| {
        distance(*a, anchor)
            .partial_cmp(&distance(*b, anchor))
            .expect("distances are finite")
    });

    // re-assign against the sorted centroids
    let assignments: Vec<usize> = points
        .iter()
        .map(|&pt| {
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (ci, &centroid) in centroids.iter().enumerate() {
                let d = distance(pt, centroid);
                if d < best_dist {
                    best_dist = d;
                    best = ci;
                }
            }
            best
        })
        .collect();

    // body cluster: nearest remaining cluster to the head cluster
    let head = centroids[0];
    let body_index = centroids
        .iter()
        .enumerate()
        .skip(1)
        .min_by(|(_, a), (_, b)| {
            distance(**a, head)
                .partial_cmp(&distance(**b, head))
                .expect("distances are finite")
        })
        .map(|(i, _)| i);

    Ok(Some(ClusterResult {
        centroids,
        body_index,
        assignments,
    }))
}
