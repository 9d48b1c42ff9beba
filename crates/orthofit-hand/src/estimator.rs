//! Adapter around the external hand-pose capability.

use std::fs;
use std::path::Path;

use image::RgbImage;
use orthofit_core::{HandLandmarks, Handedness, LANDMARK_COUNT};
use serde::{Deserialize, Serialize};

/// Errors reported by a pose estimator implementation.
#[derive(thiserror::Error, Debug)]
pub enum EstimatorError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("pose estimator failed: {0}")]
    Backend(String),
}

/// Unvalidated output of a pose estimator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHandPose {
    /// `(x, y, z)` per landmark, `x`/`y` normalized to the image size.
    pub landmarks: Vec<[f32; 3]>,
    /// Laterality label as produced by the model (`"Left"` / `"Right"`).
    #[serde(default)]
    pub handedness: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// External single-hand, static-image pose estimation capability.
///
/// Implementations return `Ok(None)` when no hand is found.
pub trait HandPoseEstimator: Send + Sync {
    fn estimate(&self, image: &RgbImage) -> Result<Option<RawHandPose>, EstimatorError>;
}

/// A validated detection.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    pub landmarks: HandLandmarks,
    /// Label as reported by the estimator, before reconciliation.
    pub raw_handedness: Handedness,
}

/// Normalizes estimator output; a single attempt per image, no retry.
pub struct LandmarkAdapter<'a> {
    estimator: &'a dyn HandPoseEstimator,
}

impl<'a> LandmarkAdapter<'a> {
    pub fn new(estimator: &'a dyn HandPoseEstimator) -> Self {
        Self { estimator }
    }

    /// Run the estimator and validate its output.
    ///
    /// Estimator failures and malformed poses are reported as "no hand".
    pub fn estimate_hand(&self, image: &RgbImage) -> Option<HandObservation> {
        let raw = match self.estimator.estimate(image) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::info!("landmarks: no hand detected");
                return None;
            }
            Err(err) => {
                log::warn!("landmarks: estimator failed: {err}");
                return None;
            }
        };
        normalize_pose(&raw)
    }
}

fn normalize_pose(raw: &RawHandPose) -> Option<HandObservation> {
    if raw.landmarks.len() != LANDMARK_COUNT {
        log::warn!(
            "landmarks: expected {LANDMARK_COUNT} points, estimator returned {}",
            raw.landmarks.len()
        );
        return None;
    }
    let clamped: Vec<[f32; 3]> = raw
        .landmarks
        .iter()
        .map(|&[x, y, z]| [x.clamp(0.0, 1.0), y.clamp(0.0, 1.0), z])
        .collect();
    let Some(landmarks) = HandLandmarks::from_triples(&clamped) else {
        log::warn!("landmarks: estimator returned non-finite coordinates");
        return None;
    };

    let raw_handedness = raw
        .handedness
        .as_deref()
        .and_then(Handedness::from_label)
        .unwrap_or_default();

    log::debug!(
        "landmarks: {LANDMARK_COUNT} points, raw handedness {raw_handedness}, score {:?}",
        raw.score
    );
    Some(HandObservation {
        landmarks,
        raw_handedness,
    })
}

/// Estimator returning a fixed answer for every image.
#[derive(Clone, Debug, Default)]
pub struct StaticPoseEstimator {
    pose: Option<RawHandPose>,
}

impl StaticPoseEstimator {
    pub fn new(pose: Option<RawHandPose>) -> Self {
        Self { pose }
    }

    /// An estimator that never finds a hand.
    pub fn no_hand() -> Self {
        Self { pose: None }
    }

    pub fn from_landmarks(landmarks: &HandLandmarks, handedness: Handedness) -> Self {
        let pose = RawHandPose {
            landmarks: landmarks.points().iter().map(|p| [p.x, p.y, p.z]).collect(),
            handedness: Some(handedness.as_str().to_string()),
            score: Some(1.0),
        };
        Self { pose: Some(pose) }
    }
}

impl HandPoseEstimator for StaticPoseEstimator {
    fn estimate(&self, _image: &RgbImage) -> Result<Option<RawHandPose>, EstimatorError> {
        Ok(self.pose.clone())
    }
}

/// Landmarks dumped by an external detector as JSON.
///
/// Accepts `{"landmarks": [[x, y, z], ...], "handedness": "Left"}`; an empty
/// `landmarks` array means no hand was found.
#[derive(Clone, Debug)]
pub struct JsonPoseEstimator {
    inner: StaticPoseEstimator,
}

impl JsonPoseEstimator {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EstimatorError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, EstimatorError> {
        let pose: RawHandPose = serde_json::from_str(raw)?;
        let pose = (!pose.landmarks.is_empty()).then_some(pose);
        Ok(Self {
            inner: StaticPoseEstimator::new(pose),
        })
    }
}

impl HandPoseEstimator for JsonPoseEstimator {
    fn estimate(&self, image: &RgbImage) -> Result<Option<RawHandPose>, EstimatorError> {
        self.inner.estimate(image)
    }
}
