//! Helper functions and utilities for tests

use animal_pose_coder::config::{AnimalCase, Config, DetectionParams, EarPairParams, VideoConfig};
use opencv::core::{self, Mat, Rect, Scalar, CV_8UC3};
use opencv::prelude::*;

/// Create a uniform black frame
pub fn create_test_frame(width: i32, height: i32) -> Mat {
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).expect("Mat allocation")
}

/// Paint a filled white square blob centered at `(cx, cy)`
pub fn draw_blob(frame: &mut Mat, cx: i32, cy: i32, half: i32) {
    frame
        .roi_mut(Rect::new(cx - half, cy - half, 2 * half, 2 * half))
        .expect("blob rect inside frame")
        .set_to(&Scalar::all(255.0), &core::no_array())
        .expect("fill blob");
}

/// A frame showing two "ear" blobs over a black background
pub fn ear_frame(width: i32, height: i32, left: (i32, i32), right: (i32, i32)) -> Mat {
    let mut frame = create_test_frame(width, height);
    draw_blob(&mut frame, left.0, left.1, 7);
    draw_blob(&mut frame, right.0, right.1, 7);
    frame
}

/// Ear-pair configuration tuned for small synthetic blobs
pub fn ear_test_config(tolerance_deg: i32, head_line_length: i32) -> Config {
    let params = EarPairParams {
        detection: DetectionParams {
            morph_open_iterations: None,
            morph_close_iterations: None,
            binarize_threshold: Some(60),
            canny_low: 150,
            canny_high: 150,
            min_contour_size: 20,
            motion_band: (5.0, 10_000.0),
            head_line_length,
            direction_tolerance_deg: tolerance_deg,
        },
    };
    Config {
        case: AnimalCase::Marmoset04(params),
        video: VideoConfig::default(),
    }
}
