//! Batch analyzer: runs the pose estimation engine over a recorded video and
//! writes the per-frame record table.

use animal_pose_coder::annotate::DisplayMode;
use animal_pose_coder::config::{AnimalCase, Config};
use animal_pose_coder::orchestrator::Orchestrator;
use animal_pose_coder::pose::FrameRecord;
use animal_pose_coder::records::{load_records, save_records};
use animal_pose_coder::utils::f64_to_i32;
use animal_pose_coder::video::{VideoReader, VideoRecorder};
use anyhow::{bail, Result};
use clap::Parser;
use log::{info, warn};
use opencv::imgcodecs;
use opencv::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to analyze
    video: PathBuf,

    /// Animal experiment case (Marmoset04, Macaque19, Rat05)
    #[arg(short, long)]
    case: Option<String>,

    /// Background reference image (defaults to <video-stem>_bg.jpg)
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Output CSV path (defaults to <video-stem>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Display image variant for the recorded analysis video
    /// (normal, diff, edges)
    #[arg(long, default_value = "normal")]
    display: String,

    /// Record the annotated analysis video next to the output CSV
    #[arg(short, long)]
    record: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Animal Pose Coder");

    // Load configuration if provided, then apply CLI overrides
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path)?
    } else {
        Config::default()
    };
    if let Some(case_name) = &args.case {
        config.case = AnimalCase::from_name(case_name)?;
    }
    if args.record {
        config.video.record = true;
    }
    config.validate()?;
    info!("Animal case: {}", config.case.name());

    let display_mode = DisplayMode::from_name(&args.display)?;

    // Open the video
    let reader = VideoReader::open(&args.video)?;
    let frame_count = reader.frame_count();
    let frame_size = reader.frame_size();
    info!(
        "Opened {}: {} frames, {}x{} @ {:.1} fps",
        args.video.display(),
        frame_count,
        frame_size.0,
        frame_size.1,
        reader.fps()
    );
    if frame_count == 0 {
        bail!("video reports zero frames");
    }

    // Background image: explicit flag or the conventional sibling file
    let background_path = args.background.clone().unwrap_or_else(|| {
        let mut path = args.video.clone();
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        path.set_file_name(format!("{stem}_bg.jpg"));
        path
    });
    let background = if background_path.is_file() {
        let image = imgcodecs::imread(
            background_path.to_str().unwrap_or_default(),
            imgcodecs::IMREAD_COLOR,
        )?;
        if image.empty() {
            bail!("cannot read background image {}", background_path.display());
        }
        info!("Background image: {}", background_path.display());
        Some(image)
    } else {
        None
    };
    if config.case.requires_background() && background.is_none() {
        bail!(
            "case {} requires a background image; expected {}",
            config.case.name(),
            background_path.display()
        );
    }

    // Resume from an existing record table so manually fixed frames replay
    let output_path = args.output.clone().unwrap_or_else(|| args.video.with_extension("csv"));
    let mut records: Vec<FrameRecord> = if output_path.is_file() {
        info!("Resuming from existing records: {}", output_path.display());
        load_records(&output_path, frame_count)?
    } else {
        (0..frame_count).map(FrameRecord::new).collect()
    };

    // Optional analysis video recording
    let recorder = if config.video.record {
        let video_path = output_path.with_extension("analysis.mp4");
        let ratio = config.video.size_ratio;
        let record_size = (
            f64_to_i32(f64::from(frame_size.0) * ratio)?,
            f64_to_i32(f64::from(frame_size.1) * ratio)?,
        );
        info!("Recording analysis video to {}", video_path.display());
        Some(VideoRecorder::create(&video_path, config.video.fps, record_size)?)
    } else {
        None
    };

    let mut orchestrator = Orchestrator::new(config, background, frame_count)?;

    // Process every frame in order
    let mut processed = 0usize;
    while let Some(frame) = reader.next_frame()? {
        if frame.index >= frame_count {
            break;
        }
        let previous = frame.index.checked_sub(1).map(|i| records[i].clone());
        let output = orchestrator.process_frame(&frame.image, &records[frame.index], previous.as_ref(), None, display_mode)?;
        if output.missing_background {
            warn!("frame {}: background image missing, pose unavailable", frame.index);
        }
        records[frame.index].pose = output.pose;
        if let Some(recorder) = &recorder {
            recorder.write(output.display)?;
        }
        processed += 1;
        if processed % 500 == 0 {
            info!("processed {processed}/{frame_count} frames");
        }
    }

    if let Some(recorder) = recorder {
        recorder.finish()?;
    }

    save_records(&output_path, &records)?;
    let missing = records.iter().filter(|r| !r.pose.direction.is_value()).count();
    info!(
        "Done: {processed} frames processed, {missing} without head direction, records written to {}",
        output_path.display()
    );

    Ok(())
}
