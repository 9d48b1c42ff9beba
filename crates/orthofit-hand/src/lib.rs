//! Hand-side stages of the measurement pipeline.
//!
//! - [`LandmarkAdapter`] wraps an external [`HandPoseEstimator`] and turns
//!   its raw output into a complete [`HandLandmarks`](orthofit_core::HandLandmarks)
//!   or nothing.
//! - [`reconcile_handedness`] overrides the estimator's left/right label
//!   from the thumb/pinky geometry.
//! - [`compute_measurements`] turns landmark distances and a scale into
//!   centimeters and a size class.
//! - [`refine_measurements`] re-measures wrist and palm on a skin mask.
//! - [`canonical_right_hand`] is the fixed layout used when no detection is
//!   available.

mod estimator;
mod handedness;
mod layout;
mod measure;
mod refine;

pub use estimator::{
    EstimatorError, HandObservation, HandPoseEstimator, JsonPoseEstimator, LandmarkAdapter,
    RawHandPose, StaticPoseEstimator,
};
pub use handedness::reconcile_handedness;
pub use layout::canonical_right_hand;
pub use measure::{compute_measurements, MeasureError, MeasureParams};
pub use refine::{refine_measurements, skin_mask, RefineError, RefineParams};
