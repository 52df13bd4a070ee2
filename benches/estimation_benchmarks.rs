//! Performance benchmarks for the pose estimation stages

use animal_pose_coder::config::DetectionParams;
use animal_pose_coder::geometry::{angle_between, angle_difference, point_from_angle_and_distance};
use animal_pose_coder::motion::MotionGate;
use animal_pose_coder::stages::{background, cluster, contours};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use opencv::core::{self, Mat, Rect, Scalar, CV_8UC3};
use opencv::prelude::*;

fn synthetic_frame(width: i32, height: i32, blobs: &[(i32, i32)]) -> Mat {
    let mut frame = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap();
    for &(cx, cy) in blobs {
        frame
            .roi_mut(Rect::new(cx - 10, cy - 10, 20, 20))
            .unwrap()
            .set_to(&Scalar::all(255.0), &core::no_array())
            .unwrap();
    }
    frame
}

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    group.bench_function("angle_between", |b| {
        b.iter(|| {
            for x in 0..100 {
                let _ = black_box(angle_between((0, 0), (x, 100 - x)));
            }
        });
    });

    group.bench_function("angle_difference", |b| {
        b.iter(|| {
            for a in -180..=180 {
                let _ = black_box(angle_difference(a, -a));
            }
        });
    });

    group.bench_function("point_from_angle_and_distance", |b| {
        b.iter(|| {
            for angle in -180..=180 {
                let _ = black_box(point_from_angle_and_distance(angle, 50.0, (100, 100), true));
            }
        });
    });

    group.finish();
}

fn bench_background_subtraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("background_subtraction");

    let frame = synthetic_frame(960, 540, &[(300, 200), (360, 200)]);
    let bg = synthetic_frame(960, 540, &[]);
    let params = DetectionParams::default();

    group.bench_function("subtract_960x540", |b| {
        b.iter(|| {
            let diff = background::subtract_background(black_box(&frame), black_box(&bg), &params).unwrap();
            black_box(diff.mask);
        });
    });

    group.finish();
}

fn bench_contour_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("contours");

    let frame = synthetic_frame(960, 540, &[(300, 200), (360, 200), (500, 400)]);
    let bg = synthetic_frame(960, 540, &[]);
    let params = DetectionParams {
        morph_open_iterations: None,
        morph_close_iterations: None,
        ..DetectionParams::default()
    };
    let diff = background::subtract_background(&frame, &bg, &params).unwrap();

    group.bench_function("edges_and_contours", |b| {
        b.iter(|| {
            let edged = contours::detect_edges(black_box(&diff.mask), 150, 150).unwrap();
            let data = contours::extract_contours(&edged, 5).unwrap();
            black_box(data.summaries.len());
        });
    });

    group.finish();
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");

    let mut points = Vec::new();
    for &(cx, cy) in &[(100, 100), (200, 150), (300, 100), (150, 300)] {
        for dx in -8..=8 {
            for dy in -8..=8 {
                points.push((cx + dx, cy + dy));
            }
        }
    }

    group.bench_function("kmeans_4_clusters", |b| {
        b.iter(|| {
            let result = cluster::cluster_by_anchor(black_box(&points), 4, (400, 100)).unwrap();
            black_box(result);
        });
    });

    group.finish();
}

fn bench_motion_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion");

    let still = synthetic_frame(960, 540, &[(300, 200)]);
    let moving = synthetic_frame(960, 540, &[(320, 210)]);

    group.bench_function("magnitude_960x540", |b| {
        b.iter(|| {
            let magnitude = MotionGate::magnitude(black_box(&moving), black_box(&still)).unwrap();
            black_box(magnitude);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_geometry,
    bench_background_subtraction,
    bench_contour_extraction,
    bench_clustering,
    bench_motion_gate
);
criterion_main!(benches);
