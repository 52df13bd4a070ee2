//! Background-subtraction stage.
//!
//! Produces a grayscale intensity difference between the current frame and a
//! stored background image, denoised with configurable morphology, plus a
//! binary foreground mask derived from it. Every pass is individually
//! toggleable; disabling all of them yields the raw grayscale difference.

use crate::config::DetectionParams;
use crate::{Error, Result};
use opencv::core::{self, Mat, Point, Size};
use opencv::imgproc;
use opencv::prelude::*;

/// Output of the background-subtraction stage
pub struct DiffImages {
    /// Grayscale intensity difference after morphological denoising
    pub gray: Mat,
    /// Binary foreground mask (equals `gray` when thresholding is disabled)
    pub mask: Mat,
}

/// Subtract `background` from `frame` and derive the foreground mask
///
/// # Errors
///
/// Returns a `Config` error when the background dimensions or channel count
/// do not match the frame; the images are never silently cropped or resized.
pub fn subtract_background(frame: &Mat, background: &Mat, params: &DetectionParams) -> Result<DiffImages> {
    let frame_size = frame.size()?;
    let bg_size = background.size()?;
    if frame_size != bg_size || frame.channels() != background.channels() {
        return Err(Error::Config(format!(
            "background image {}x{}x{} does not match frame {}x{}x{}",
            bg_size.width,
            bg_size.height,
            background.channels(),
            frame_size.width,
            frame_size.height,
            frame.channels(),
        )));
    }

    let mut diff_color = Mat::default();
    core::absdiff(frame, background, &mut diff_color)?;
    let mut gray = Mat::default();
    imgproc::cvt_color(&diff_color, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

    let kernel = imgproc::get_structuring_element(imgproc::MORPH_RECT, Size::new(3, 3), Point::new(-1, -1))?;
    if let Some(iterations) = params.morph_open_iterations {
        // suppress small spurious foreground
        let src = gray.clone();
        imgproc::morphology_ex(
            &src,
            &mut gray,
            imgproc::MORPH_OPEN,
            &kernel,
            Point::new(-1, -1),
            iterations,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
    }
    if let Some(iterations) = params.morph_close_iterations {
        // fill small holes
        let src = gray.clone();
        imgproc::morphology_ex(
            &src,
            &mut gray,
            imgproc::MORPH_CLOSE,
            &kernel,
            Point::new(-1, -1),
            iterations,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
    }

    let mask = if let Some(threshold) = params.binarize_threshold {
        let mut mask = Mat::default();
        imgproc::threshold(&gray, &mut mask, f64::from(threshold), 255.0, imgproc::THRESH_BINARY)?;
        mask
    } else {
        gray.clone()
    };

    Ok(DiffImages { gray, mask })
}
