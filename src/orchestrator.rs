//! Frame orchestrator: decides per frame whether and how to estimate a pose.
//!
//! Manual input short-circuits detection, persisted manual fixes replay
//! verbatim, continuous-manual mode copies the previous frame, and everything
//! else passes through the motion gate before the case estimator runs. A
//! frame's pose is always replaced atomically: either a fully resolved new
//! pose or an explicit carried-forward/unavailable one.

use crate::annotate::{self, DisplayMode};
use crate::config::Config;
use crate::estimators::{self, Diagnostics, EstimatorContext, FrameState};
use crate::geometry::{angle_between, Point};
use crate::motion::{GateDecision, MotionGate};
use crate::pose::{validate_manual_position, Field, FrameRecord, Pose};
use crate::{Error, Result};
use opencv::core::Mat;
use opencv::prelude::*;

/// Head and base positions supplied by a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualInput {
    /// Head position
    pub head: Point,
    /// Base position
    pub base: Point,
}

/// Result of processing one frame
pub struct FrameOutput {
    /// The frame's new pose, to be committed by the caller
    pub pose: Pose,
    /// How the pose was obtained
    pub state: FrameState,
    /// Motion-gate decision, when the gate was consulted
    pub gate: Option<GateDecision>,
    /// The case requires a background image and none is loaded
    pub missing_background: bool,
    /// Annotated image for display
    pub display: Mat,
}

/// Per-session frame processor
///
/// Owns the background image and the motion-gate state; reads the previous
/// frame's record but never mutates the record store itself.
pub struct Orchestrator {
    config: Config,
    background: Option<Mat>,
    gate: MotionGate,
    frame_count: usize,
    continuous_manual: bool,
}

impl Orchestrator {
    /// Create an orchestrator for a session of `frame_count` frames
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the configuration does not validate.
    pub fn new(config: Config, background: Option<Mat>, frame_count: usize) -> Result<Self> {
        config.validate()?;
        let band = config.case.detection().motion_band;
        Ok(Self {
            config,
            background,
            gate: MotionGate::new(band),
            frame_count,
            continuous_manual: false,
        })
    }

    /// The loaded background image, if any
    #[must_use]
    pub fn background(&self) -> Option<&Mat> {
        self.background.as_ref()
    }

    /// Toggle continuous manual input (scrubbing without re-detection)
    pub fn set_continuous_manual(&mut self, enabled: bool) {
        self.continuous_manual = enabled;
    }

    /// Forget motion state after a random seek
    pub fn reset_motion(&mut self) {
        self.gate.reset();
    }

    /// Process one frame and produce its new pose plus the display image
    ///
    /// `record` is the frame's current (possibly previously computed) record
    /// and `previous` is the record of frame `index - 1`, or `None` at
    /// frame 0 or right after a seek to an uncomputed region.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for out-of-range manual input and `Config`
    /// errors from the stages; detection insufficiency and a missing
    /// background never escape as errors.
    pub fn process_frame(
        &mut self,
        frame: &Mat,
        record: &FrameRecord,
        previous: Option<&FrameRecord>,
        manual: Option<ManualInput>,
        mode: DisplayMode,
    ) -> Result<FrameOutput> {
        let previous_pose = previous.map_or_else(Pose::unset, |r| r.pose);

        // 1. explicit manual input wins over everything
        if let Some(input) = manual {
            let size = frame.size()?;
            let head = validate_manual_position(input.head, size.width, size.height)?;
            let base = validate_manual_position(input.base, size.width, size.height)?;
            let pose = Pose {
                head: Field::Value(head),
                base: Field::Value(base),
                direction: Field::Value(angle_between(base, head)),
                head_manual: true,
                direction_manual: true,
            };
            return self.output(frame, record, pose, FrameState::ManualOverride, None, false, &Diagnostics::default(), mode);
        }

        // 2. a direction fixed manually in an earlier session replays verbatim
        if record.pose.direction_manual {
            return self.output(
                frame,
                record,
                record.pose,
                FrameState::ManualOverride,
                None,
                false,
                &Diagnostics::default(),
                mode,
            );
        }

        // 3. continuous manual input copies the previous frame wholesale
        if self.continuous_manual {
            return self.output(
                frame,
                record,
                previous_pose,
                FrameState::ManualOverride,
                None,
                false,
                &Diagnostics::default(),
                mode,
            );
        }

        // 4. motion gate decides whether detection runs at all
        let decision = self.gate.evaluate(frame)?;
        if decision.passed() {
            let ctx = EstimatorContext {
                frame,
                background: self.background.as_ref(),
                previous: previous_pose,
            };
            match estimators::estimate(&self.config.case, &ctx) {
                Ok(estimate) => self.output(
                    frame,
                    record,
                    estimate.pose,
                    estimate.state,
                    Some(decision),
                    false,
                    &estimate.diagnostics,
                    mode,
                ),
                Err(Error::MissingBackground) => {
                    log::warn!(
                        "case {} requires a background image; frame {} left unresolved",
                        self.config.case.name(),
                        record.index
                    );
                    self.output(
                        frame,
                        record,
                        record.pose,
                        FrameState::Unavailable,
                        Some(decision),
                        true,
                        &Diagnostics::default(),
                        mode,
                    )
                }
                Err(e) => Err(e),
            }
        } else {
            match decision {
                GateDecision::Below(magnitude) => {
                    log::debug!("frame {}: motion {magnitude:.1} below band, carrying pose", record.index);
                }
                GateDecision::Above(magnitude) => {
                    // behaves like "below" but deserves a louder note: a
                    // disturbance this large may be a camera cut
                    log::info!("frame {}: motion {magnitude:.1} above band, carrying pose", record.index);
                }
                _ => {}
            }
            let (pose, state) = self.carried_pose(previous_pose);
            self.output(frame, record, pose, state, Some(decision), false, &Diagnostics::default(), mode)
        }
    }

    /// Previous pose carried through a no-motion frame, with the head
    /// position recomputed from the carried direction and base
    fn carried_pose(&self, previous: Pose) -> (Pose, FrameState) {
        if previous == Pose::unset() {
            return (Pose::unset(), FrameState::Unavailable);
        }
        let mut pose = previous;
        pose.head_manual = false;
        pose.direction_manual = false;
        if let (Some(direction), Some(base)) = (pose.direction.value(), pose.base.value()) {
            pose.head = Field::Value(estimators::reconcile_head(direction, base, self.config.case.detection()));
        }
        (pose, FrameState::CarryForwardNoMotion)
    }

    #[allow(clippy::too_many_arguments)]
    fn output(
        &self,
        frame: &Mat,
        record: &FrameRecord,
        pose: Pose,
        state: FrameState,
        gate: Option<GateDecision>,
        missing_background: bool,
        diagnostics: &Diagnostics,
        mode: DisplayMode,
    ) -> Result<FrameOutput> {
        let mut display = annotate::select_display(frame, diagnostics, mode)?;
        annotate::draw_pose(&mut display, &pose)?;
        annotate::draw_status(&mut display, record.index, self.frame_count, &pose)?;
        if missing_background {
            annotate::draw_missing_background(&mut display)?;
        }
        Ok(FrameOutput {
            pose,
            state,
            gate,
            missing_background,
            display,
        })
    }
}
