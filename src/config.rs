//! Configuration management: animal experiment cases and their tunables.
//!
//! Each experiment case pairs a detection strategy with a parameter set.
//! Cases are a closed enum so the orchestrator dispatches with a single
//! pattern match; case names appear as strings only at the CLI/YAML boundary.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An inclusive HSV color range
///
/// Hue uses the `OpenCV` 8-bit convention (0..=180 meaningful); saturation
/// and value are 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    /// Minimum H, S, V
    pub min: [i32; 3],
    /// Maximum H, S, V
    pub max: [i32; 3],
}

impl HsvRange {
    /// A range spanning `min` to `max` triples
    #[must_use]
    pub fn new(min: [i32; 3], max: [i32; 3]) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<()> {
        for i in 0..3 {
            if !(0..=255).contains(&self.min[i]) || !(0..=255).contains(&self.max[i]) {
                return Err(Error::Config(format!("{name}: HSV component outside 0..=255")));
            }
            if self.min[i] > self.max[i] {
                return Err(Error::Config(format!("{name}: HSV min exceeds max")));
            }
        }
        Ok(())
    }
}

/// Tunables shared by every detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Morphological opening iterations after background subtraction
    /// (`None` disables the pass)
    pub morph_open_iterations: Option<i32>,
    /// Morphological closing iterations (`None` disables the pass)
    pub morph_close_iterations: Option<i32>,
    /// Binarization threshold applied to the difference image
    /// (`None` keeps the raw grayscale difference)
    pub binarize_threshold: Option<i32>,
    /// Lower hysteresis threshold for edge detection
    pub canny_low: i32,
    /// Upper hysteresis threshold for edge detection
    pub canny_high: i32,
    /// Minimum contour size (bounding-box width + height)
    pub min_contour_size: i32,
    /// Accepted motion magnitude band `[min, max)`
    pub motion_band: (f64, f64),
    /// Length in pixels of the head-direction ray from the base position
    pub head_line_length: i32,
    /// Maximum accepted frame-to-frame direction change in degrees
    pub direction_tolerance_deg: i32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            morph_open_iterations: Some(8),
            morph_close_iterations: Some(8),
            binarize_threshold: Some(60),
            canny_low: 150,
            canny_high: 150,
            min_contour_size: 50,
            motion_band: (35.0, 100.0),
            head_line_length: 50,
            direction_tolerance_deg: 20,
        }
    }
}

/// Parameters for the two-blob ear-pair strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EarPairParams {
    /// Shared detection tunables
    pub detection: DetectionParams,
}

/// Parameters for the color-segmented head/face strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMarkedParams {
    /// Shared detection tunables
    pub detection: DetectionParams,
    /// Head search rect size as a ratio of the frame height
    pub head_region_size_ratio: f64,
    /// Color of the panel the subject sits behind (bounds the search area)
    pub panel: HsvRange,
    /// Head color under normal ambient light
    pub head_normal: HsvRange,
    /// Head color while the ambient screen color is active
    pub head_active: HsvRange,
    /// Face color under normal ambient light
    pub face_normal: HsvRange,
    /// Secondary face color while the ambient screen color is active
    pub face_active: HsvRange,
    /// Ambient hue median band marking the "active" screen state
    pub screen_hue_band: (i32, i32),
    /// Ambient saturation median band marking the "active" screen state
    pub screen_sat_band: (i32, i32),
}

impl Default for ColorMarkedParams {
    fn default() -> Self {
        Self {
            detection: DetectionParams {
                morph_open_iterations: Some(1),
                morph_close_iterations: None,
                binarize_threshold: Some(30),
                canny_low: 10,
                canny_high: 30,
                min_contour_size: 50,
                motion_band: (35.0, 300.0),
                head_line_length: 150,
                direction_tolerance_deg: 30,
            },
            head_region_size_ratio: 0.5,
            panel: HsvRange::new([60, 0, 0], [100, 150, 150]),
            head_normal: HsvRange::new([0, 100, 30], [20, 255, 120]),
            head_active: HsvRange::new([0, 100, 30], [20, 255, 130]),
            face_normal: HsvRange::new([0, 140, 100], [10, 255, 220]),
            face_active: HsvRange::new([150, 120, 120], [200, 255, 230]),
            screen_hue_band: (95, 135),
            screen_sat_band: (30, 65),
        }
    }
}

/// Parameters for the cluster-based strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Shared detection tunables
    pub detection: DetectionParams,
    /// Number of k-means clusters over foreground pixels
    pub cluster_count: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            detection: DetectionParams {
                morph_open_iterations: Some(2),
                morph_close_iterations: None,
                binarize_threshold: Some(50),
                canny_low: 150,
                canny_high: 150,
                min_contour_size: 5,
                motion_band: (25.0, 100.0),
                head_line_length: 30,
                direction_tolerance_deg: 30,
            },
            cluster_count: 4,
        }
    }
}

/// An animal experiment case: detection strategy plus its parameter set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case", content = "params")]
pub enum AnimalCase {
    /// Common marmoset, ear blobs against a static background
    Marmoset04(EarPairParams),
    /// Macaque, color-marked head and face behind a colored panel
    Macaque19(ColorMarkedParams),
    /// Rat, k-means clustering of foreground pixels
    Rat05(ClusterParams),
}

impl AnimalCase {
    /// Case name as used at the CLI/config boundary
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AnimalCase::Marmoset04(_) => "Marmoset04",
            AnimalCase::Macaque19(_) => "Macaque19",
            AnimalCase::Rat05(_) => "Rat05",
        }
    }

    /// Construct a case with built-in default parameters from its name
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown case name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "Marmoset04" => Ok(AnimalCase::Marmoset04(EarPairParams::default())),
            "Macaque19" => Ok(AnimalCase::Macaque19(ColorMarkedParams::default())),
            "Rat05" => Ok(AnimalCase::Rat05(ClusterParams::default())),
            other => Err(Error::InvalidInput(format!("unknown animal case {other:?}"))),
        }
    }

    /// The shared detection tunables of this case
    #[must_use]
    pub fn detection(&self) -> &DetectionParams {
        match self {
            AnimalCase::Marmoset04(p) => &p.detection,
            AnimalCase::Macaque19(p) => &p.detection,
            AnimalCase::Rat05(p) => &p.detection,
        }
    }

    /// Whether this case's estimator needs a background reference image
    #[must_use]
    pub fn requires_background(&self) -> bool {
        match self {
            AnimalCase::Marmoset04(_) | AnimalCase::Rat05(_) => true,
            AnimalCase::Macaque19(_) => false,
        }
    }
}

/// Result-video recording settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Record the annotated analysis frames to a video file
    pub record: bool,
    /// Frames per second of the recorded video
    pub fps: f64,
    /// Recorded frame size as a ratio of the source frame size
    pub size_ratio: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            record: false,
            fps: 30.0,
            size_ratio: 0.5,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Active animal experiment case
    pub case: AnimalCase,
    /// Result-video recording settings
    pub video: VideoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case: AnimalCase::Marmoset04(EarPairParams::default()),
            video: VideoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a `Config` error describing the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        let det = self.case.detection();
        if det.motion_band.0 < 0.0 || det.motion_band.0 >= det.motion_band.1 {
            return Err(Error::Config(format!(
                "motion band [{}, {}) must be non-negative and ascending",
                det.motion_band.0, det.motion_band.1
            )));
        }
        if det.head_line_length <= 0 {
            return Err(Error::Config("head line length must be positive".to_string()));
        }
        if det.direction_tolerance_deg <= 0 || det.direction_tolerance_deg > 180 {
            return Err(Error::Config(
                "direction tolerance must be within (0, 180]".to_string(),
            ));
        }
        if det.canny_low < 0 || det.canny_high < det.canny_low {
            return Err(Error::Config("Canny thresholds must be ascending and non-negative".to_string()));
        }
        for (name, iters) in [
            ("morph open iterations", det.morph_open_iterations),
            ("morph close iterations", det.morph_close_iterations),
        ] {
            if let Some(n) = iters {
                if n < 0 {
                    return Err(Error::Config(format!("{name} must be non-negative")));
                }
            }
        }
        if let Some(th) = det.binarize_threshold {
            if !(0..=255).contains(&th) {
                return Err(Error::Config("binarize threshold must be within 0..=255".to_string()));
            }
        }

        match &self.case {
            AnimalCase::Marmoset04(_) => {}
            AnimalCase::Macaque19(p) => {
                if p.head_region_size_ratio <= 0.0 || p.head_region_size_ratio > 1.0 {
                    return Err(Error::Config("head region size ratio must be within (0, 1]".to_string()));
                }
                p.panel.validate("panel color")?;
                p.head_normal.validate("head color")?;
                p.head_active.validate("head color (active)")?;
                p.face_normal.validate("face color")?;
                p.face_active.validate("face color (active)")?;
            }
            AnimalCase::Rat05(p) => {
                if p.cluster_count == 0 {
                    return Err(Error::Config("cluster count must be positive".to_string()));
                }
            }
        }

        if self.video.fps <= 0.0 {
            return Err(Error::Config("video FPS must be positive".to_string()));
        }
        if self.video.size_ratio <= 0.0 || self.video.size_ratio > 1.0 {
            return Err(Error::Config("video size ratio must be within (0, 1]".to_string()));
        }

        Ok(())
    }
}
