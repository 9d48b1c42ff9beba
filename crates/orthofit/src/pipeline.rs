//! Tiered measurement pipeline.
//!
//! Tiers run in order; the first one that produces measurements and an
//! output image wins. Detection failures only demote the result, they are
//! never returned as errors. Each tier runs at most once per request and
//! the hand estimator is called at most once.

use std::cell::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use image::{ImageFormat, RgbImage};
use orthofit_calib::{CalibrationError, CalibrationResult, ColorSquareDetector};
use orthofit_core::{HandLandmarks, Handedness, Measurements};
use orthofit_hand::{
    canonical_right_hand, compute_measurements, reconcile_handedness, refine_measurements,
    HandObservation, HandPoseEstimator, LandmarkAdapter, MeasureError, RefineError,
};
use orthofit_mesh::{fit_brace, to_stl_bytes, BraceMesh, MeshError, TemplateStore};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    annotate, decode_image, encode_image, encoded_format, synthesize_measurements, PipelineConfig,
};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("cannot decode image: {0}")]
    CannotDecodeImage(#[source] image::ImageError),
    #[error("every pipeline tier failed")]
    TiersExhausted,
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("fallback scale must be finite and > 0 (got {0})")]
    InvalidFallbackScale(f64),
    #[error("invalid last-resort range [{lo}, {hi}]")]
    InvalidLastResortRange { lo: f64, hi: f64 },
    #[error("invalid measure settings: {0}")]
    InvalidMeasureParams(#[source] MeasureError),
    #[error("invalid refine settings: {0}")]
    InvalidRefineParams(#[source] RefineError),
    #[error("invalid mesh settings: {0}")]
    InvalidMeshParams(#[source] MeshError),
}

/// Fidelity level that produced a result, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Detected landmarks, silhouette-refined widths.
    Full,
    /// Detected landmarks, multiplier widths.
    Simplified,
    /// Canned landmark layout.
    BasicFallback,
    /// Synthesized measurements, original image, no mesh.
    LastResort,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Full,
        Tier::Simplified,
        Tier::BasicFallback,
        Tier::LastResort,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Full => "full",
            Tier::Simplified => "simplified",
            Tier::BasicFallback => "basic_fallback",
            Tier::LastResort => "last_resort",
        }
    }

    /// True for tiers that did not use a detected hand.
    pub fn is_degraded(self) -> bool {
        self >= Tier::BasicFallback
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One photo to process.
#[derive(Clone, Debug, Default)]
pub struct PipelineRequest {
    pub image_bytes: Vec<u8>,
    /// Skip detection and start at the canned layout.
    pub manual_mode: bool,
    /// Brace template to fit; no mesh is produced without one.
    pub template_path: Option<PathBuf>,
}

impl PipelineRequest {
    pub fn new(image_bytes: Vec<u8>) -> Self {
        Self {
            image_bytes,
            ..Self::default()
        }
    }

    pub fn manual(mut self, manual_mode: bool) -> Self {
        self.manual_mode = manual_mode;
        self
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }
}

/// Image returned with a result.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputImage {
    /// Overlay drawn, re-encoded in the input's format.
    Annotated(Vec<u8>),
    /// The request's bytes, untouched.
    Original(Vec<u8>),
}

impl OutputImage {
    pub fn bytes(&self) -> &[u8] {
        match self {
            OutputImage::Annotated(b) | OutputImage::Original(b) => b,
        }
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, OutputImage::Annotated(_))
    }
}

#[derive(Clone, Debug)]
pub struct PipelineResult {
    pub tier: Tier,
    pub measurements: Measurements,
    pub handedness: Handedness,
    /// Label reported by the estimator before reconciliation.
    pub raw_handedness: Option<Handedness>,
    /// Landmarks the measurements were taken from (detected or canned).
    pub landmarks: Option<HandLandmarks>,
    pub calibration: Option<CalibrationResult>,
    pub image: OutputImage,
    /// Format of the input photo.
    pub image_format: ImageFormat,
    pub mesh: Option<BraceMesh>,
    /// Binary STL of `mesh`.
    pub stl: Option<Vec<u8>>,
}

impl PipelineResult {
    /// Container format of the bytes in `image`.
    pub fn output_format(&self) -> ImageFormat {
        match self.image {
            OutputImage::Annotated(_) => encoded_format(self.image_format),
            OutputImage::Original(_) => self.image_format,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum TierFailure {
    #[error("no hand detected")]
    NoHand,
    #[error(transparent)]
    Measure(#[from] MeasureError),
    #[error(transparent)]
    Refine(#[from] RefineError),
    #[error("annotated image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

struct TierOutput {
    measurements: Measurements,
    handedness: Handedness,
    raw_handedness: Option<Handedness>,
    landmarks: Option<HandLandmarks>,
    image: OutputImage,
}

/// Per-request state shared by the tiers.
struct Frame<'a> {
    request: &'a PipelineRequest,
    rgb: RgbImage,
    format: ImageFormat,
    calibration: Option<CalibrationResult>,
    scale: f64,
    observation: OnceCell<Option<HandObservation>>,
}

/// Long-lived pipeline: validated configuration, injected hand estimator
/// and the shared template cache. Safe to share across threads.
pub struct Pipeline {
    config: PipelineConfig,
    detector: ColorSquareDetector,
    estimator: Arc<dyn HandPoseEstimator>,
    templates: Arc<TemplateStore>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        estimator: Arc<dyn HandPoseEstimator>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let detector = ColorSquareDetector::new(config.calibration.clone())?;
        Ok(Self {
            config,
            detector,
            estimator,
            templates: Arc::new(TemplateStore::new()),
        })
    }

    /// Share a template cache with other pipelines.
    pub fn with_templates(mut self, templates: Arc<TemplateStore>) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn templates(&self) -> &Arc<TemplateStore> {
        &self.templates
    }

    /// Process one photo.
    ///
    /// Fails only when the bytes cannot be decoded or, in principle, when
    /// every tier fails.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip_all,
            fields(bytes = request.image_bytes.len(), manual = request.manual_mode)
        )
    )]
    pub fn run(&self, request: &PipelineRequest) -> Result<PipelineResult, PipelineError> {
        let decoded =
            decode_image(&request.image_bytes).map_err(PipelineError::CannotDecodeImage)?;
        let (w, h) = decoded.rgb.dimensions();
        log::info!("decoded {w}x{h} {:?} image", decoded.format);

        let calibration = self.detector.detect(&decoded.rgb);
        let scale = match &calibration {
            Some(cal) => {
                log::info!(
                    "calibration square {}x{} px -> {:.2} px/cm",
                    cal.bbox.w,
                    cal.bbox.h,
                    cal.scale_px_per_cm
                );
                cal.scale_px_per_cm
            }
            None => {
                log::warn!(
                    "calibration square not found, using fallback {:.2} px/cm",
                    self.config.fallback_scale_px_per_cm
                );
                self.config.fallback_scale_px_per_cm
            }
        };

        let frame = Frame {
            request,
            rgb: decoded.rgb,
            format: decoded.format,
            calibration,
            scale,
            observation: OnceCell::new(),
        };

        let tiers: &[Tier] = if request.manual_mode {
            &Tier::ALL[2..]
        } else {
            &Tier::ALL
        };
        for &tier in tiers {
            log::debug!("trying tier {tier}");
            match self.run_tier(tier, &frame) {
                Ok(out) => return Ok(self.finish(tier, frame, out)),
                Err(reason) => log::warn!("tier {tier} abandoned: {reason}"),
            }
        }
        Err(PipelineError::TiersExhausted)
    }

    fn run_tier(&self, tier: Tier, frame: &Frame<'_>) -> Result<TierOutput, TierFailure> {
        match tier {
            Tier::Full | Tier::Simplified => {
                let obs = self.observe(frame).ok_or(TierFailure::NoHand)?;
                let handedness = reconcile_handedness(&obs.landmarks, obs.raw_handedness);
                let mut m = self.measure(&obs.landmarks, frame)?;
                if tier == Tier::Full {
                    m = refine_measurements(
                        &frame.rgb,
                        &obs.landmarks,
                        &m,
                        &self.config.measure,
                        &self.config.refine,
                    )?;
                }
                let image = self.annotated(frame, &obs.landmarks, &m)?;
                Ok(TierOutput {
                    measurements: m,
                    handedness,
                    raw_handedness: Some(obs.raw_handedness),
                    landmarks: Some(obs.landmarks.clone()),
                    image,
                })
            }
            Tier::BasicFallback => {
                let landmarks = canonical_right_hand();
                let handedness = reconcile_handedness(&landmarks, Handedness::Right);
                let m = self.measure(&landmarks, frame)?;
                let image = self.annotated(frame, &landmarks, &m)?;
                Ok(TierOutput {
                    measurements: m,
                    handedness,
                    raw_handedness: None,
                    landmarks: Some(landmarks),
                    image,
                })
            }
            Tier::LastResort => {
                let (w, h) = frame.rgb.dimensions();
                let m = synthesize_measurements(
                    frame.scale,
                    w,
                    h,
                    &self.config.last_resort,
                    &self.config.measure,
                );
                Ok(TierOutput {
                    measurements: m,
                    handedness: Handedness::Right,
                    raw_handedness: None,
                    landmarks: None,
                    image: OutputImage::Original(frame.request.image_bytes.clone()),
                })
            }
        }
    }

    /// Single estimator call per request, shared by Full and Simplified.
    fn observe<'f>(&self, frame: &'f Frame<'_>) -> Option<&'f HandObservation> {
        frame
            .observation
            .get_or_init(|| {
                let obs = LandmarkAdapter::new(self.estimator.as_ref()).estimate_hand(&frame.rgb);
                match &obs {
                    Some(o) => log::info!("hand detected, estimator says {}", o.raw_handedness),
                    None => log::warn!("no hand detected"),
                }
                obs
            })
            .as_ref()
    }

    fn measure(
        &self,
        landmarks: &HandLandmarks,
        frame: &Frame<'_>,
    ) -> Result<Measurements, MeasureError> {
        let (w, h) = frame.rgb.dimensions();
        compute_measurements(landmarks, frame.scale, w, h, &self.config.measure)
    }

    fn annotated(
        &self,
        frame: &Frame<'_>,
        landmarks: &HandLandmarks,
        m: &Measurements,
    ) -> Result<OutputImage, image::ImageError> {
        let drawn = annotate(
            &frame.rgb,
            landmarks,
            m,
            frame.calibration.as_ref(),
            &self.config.annotation,
        );
        Ok(OutputImage::Annotated(encode_image(&drawn, frame.format)?))
    }

    fn fit_mesh(&self, tier: Tier, frame: &Frame<'_>, out: &TierOutput) -> Option<BraceMesh> {
        if tier == Tier::LastResort {
            return None;
        }
        let path = frame.request.template_path.as_ref()?;
        let fitted = self.templates.get(path).and_then(|template| {
            fit_brace(
                &template,
                out.measurements.wrist_width_cm,
                out.handedness,
                &self.config.mesh,
            )
        });
        match fitted {
            Ok(mesh) => Some(mesh),
            Err(err) => {
                log::warn!("mesh not produced: {err}");
                None
            }
        }
    }

    fn finish(&self, tier: Tier, frame: Frame<'_>, out: TierOutput) -> PipelineResult {
        if let Some(raw) = out.raw_handedness {
            if raw != out.handedness {
                log::info!("handedness {raw} reconciled to {}", out.handedness);
            }
        }
        let mesh = self.fit_mesh(tier, &frame, &out);
        let stl = mesh.as_ref().map(to_stl_bytes);
        log::info!(
            "tier {tier}: wrist {} cm, palm {} cm, length {} cm, size {}, {}",
            out.measurements.wrist_width_cm,
            out.measurements.palm_width_cm,
            out.measurements.hand_length_cm,
            out.measurements.size_class,
            out.handedness
        );
        PipelineResult {
            tier,
            measurements: out.measurements,
            handedness: out.handedness,
            raw_handedness: out.raw_handedness,
            landmarks: out.landmarks,
            calibration: frame.calibration,
            image: out.image,
            image_format: frame.format,
            mesh,
            stl,
        }
    }
}
