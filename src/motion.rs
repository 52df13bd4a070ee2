//! Motion gating between consecutive processed frames.
//!
//! The orchestrator only dispatches a pose estimator when the scalar motion
//! magnitude against the last accepted-motion frame falls inside a configured
//! band. Out-of-band frames carry the previous pose forward; the below-band
//! and above-band paths behave identically but are reported distinctly so an
//! anomalous disturbance (camera bump, lighting cut) stays visible in logs.

use crate::Result;
use opencv::core::{self, Mat};
use opencv::imgproc;

/// Outcome of evaluating one frame against the motion band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// No reference frame yet; detection always runs
    FirstFrame,
    /// Magnitude inside `[min, max)`: detection runs
    Pass(f64),
    /// Magnitude below the band: carry the previous pose forward
    Below(f64),
    /// Magnitude at or above the band: carried forward like `Below`, but
    /// worth flagging
    Above(f64),
}

impl GateDecision {
    /// Whether this decision dispatches the estimator
    #[must_use]
    pub fn passed(self) -> bool {
        matches!(self, GateDecision::FirstFrame | GateDecision::Pass(_))
    }
}

/// Motion detector comparing each frame against the last accepted one
pub struct MotionGate {
    band: (f64, f64),
    last_motion_frame: Option<Mat>,
}

impl MotionGate {
    /// Create a gate with the accepted magnitude band `[min, max)`
    #[must_use]
    pub fn new(band: (f64, f64)) -> Self {
        Self {
            band,
            last_motion_frame: None,
        }
    }

    /// Scalar motion magnitude between two frames:
    /// `sqrt(sum(gray(absdiff)) / 255)`
    ///
    /// # Errors
    ///
    /// Returns an error if an `OpenCV` operation fails.
    pub fn magnitude(frame: &Mat, reference: &Mat) -> Result<f64> {
        let mut diff = Mat::default();
        core::absdiff(frame, reference, &mut diff)?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&diff, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        let total = core::sum_elems(&gray)?;
        Ok((total[0] / 255.0).sqrt())
    }

    /// Evaluate `frame`, updating the stored reference only when the gate
    /// passes
    ///
    /// # Errors
    ///
    /// Returns an error if an `OpenCV` operation fails.
    pub fn evaluate(&mut self, frame: &Mat) -> Result<GateDecision> {
        let Some(reference) = &self.last_motion_frame else {
            self.last_motion_frame = Some(frame.clone());
            return Ok(GateDecision::FirstFrame);
        };

        let magnitude = Self::magnitude(frame, reference)?;
        let decision = if magnitude < self.band.0 {
            GateDecision::Below(magnitude)
        } else if magnitude >= self.band.1 {
            GateDecision::Above(magnitude)
        } else {
            self.last_motion_frame = Some(frame.clone());
            GateDecision::Pass(magnitude)
        };
        Ok(decision)
    }

    /// Forget the stored reference (e.g. after a random seek)
    pub fn reset(&mut self) {
        self.last_motion_frame = None;
    }
}
