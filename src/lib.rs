//! Animal pose coding library for frame-by-frame video analysis.
//!
//! This library estimates an animal's head position, body/base position and
//! head direction for each frame of a recorded video, using computer-vision
//! heuristics tailored per animal experiment case:
//! - background subtraction and contour analysis for subjects whose ears show
//!   up as motion blobs,
//! - HSV color segmentation for subjects whose head and face are
//!   color-distinguished,
//! - k-means clustering of foreground pixels for subjects tracked as
//!   connected blobs.
//!
//! Detection is gated by frame-to-frame motion and guarded by a continuity
//! policy: a measurement that jumps further than the configured tolerance is
//! rejected in favor of the previous frame's pose, and outright detection
//! failures fall back to the previous pose or an explicit "unavailable"
//! value.
//!
//! # Examples
//!
//! ## Processing frames
//!
//! ```no_run
//! use animal_pose_coder::annotate::DisplayMode;
//! use animal_pose_coder::config::{AnimalCase, Config, VideoConfig};
//! use animal_pose_coder::orchestrator::Orchestrator;
//! use animal_pose_coder::pose::FrameRecord;
//! use animal_pose_coder::video::VideoReader;
//! use opencv::imgcodecs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = VideoReader::open("session.mp4")?;
//! let background = imgcodecs::imread("session_bg.jpg", imgcodecs::IMREAD_COLOR)?;
//!
//! let config = Config {
//!     case: AnimalCase::from_name("Marmoset04")?,
//!     video: VideoConfig::default(),
//! };
//! let mut records: Vec<FrameRecord> = (0..reader.frame_count()).map(FrameRecord::new).collect();
//! let mut orchestrator = Orchestrator::new(config, Some(background), reader.frame_count())?;
//!
//! while let Some(frame) = reader.next_frame()? {
//!     let previous = frame.index.checked_sub(1).map(|i| records[i].clone());
//!     let output = orchestrator.process_frame(
//!         &frame.image,
//!         &records[frame.index],
//!         previous.as_ref(),
//!         None,
//!         DisplayMode::Normal,
//!     )?;
//!     records[frame.index].pose = output.pose;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Manual input
//!
//! ```no_run
//! use animal_pose_coder::annotate::DisplayMode;
//! use animal_pose_coder::config::{AnimalCase, Config, VideoConfig};
//! use animal_pose_coder::orchestrator::{ManualInput, Orchestrator};
//! use animal_pose_coder::pose::FrameRecord;
//! use opencv::core::{Mat, Scalar, CV_8UC3};
//! use opencv::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     case: AnimalCase::from_name("Macaque19")?,
//!     video: VideoConfig::default(),
//! };
//! let mut orchestrator = Orchestrator::new(config, None, 100)?;
//! let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0))?;
//!
//! // a click-and-drag gesture fixes head and base positions directly
//! let manual = ManualInput {
//!     head: (320, 200),
//!     base: (300, 240),
//! };
//! let output = orchestrator.process_frame(&frame, &FrameRecord::new(0), None, Some(manual), DisplayMode::Normal)?;
//! assert!(output.pose.direction_manual);
//! # Ok(())
//! # }
//! ```

/// On-frame annotation of pose results and status messages
pub mod annotate;

/// Configuration management: animal cases and parameter sets
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Error types and result handling
pub mod error;

/// Per-case pose estimators and the shared continuity policy
pub mod estimators;

/// Planar geometry helpers
pub mod geometry;

/// Motion gating between consecutive frames
pub mod motion;

/// Frame orchestration: manual input, motion gate, estimator dispatch
pub mod orchestrator;

/// Core data model: poses and frame records
pub mod pose;

/// CSV persistence of the frame record table
pub mod records;

/// Image-processing stages composed by the estimators
pub mod stages;

/// Safe casting utilities
pub mod utils;

/// Worker-thread video reading and writing
pub mod video;

pub use error::{Error, Result};
