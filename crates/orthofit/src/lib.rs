//! High-level facade for the `orthofit-*` workspace.
//!
//! One photograph of a hand next to a 6 cm blue calibration square goes
//! in; calibrated wrist/palm/length measurements, a brace size class, an
//! annotated image and (optionally) a fitted brace STL come out.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use orthofit::hand::JsonPoseEstimator;
//! use orthofit::{Pipeline, PipelineConfig, PipelineRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let estimator = Arc::new(JsonPoseEstimator::load("landmarks.json")?);
//! let pipeline = Pipeline::new(PipelineConfig::default(), estimator)?;
//!
//! let request = PipelineRequest::new(std::fs::read("hand.jpg")?).with_template("brace.stl");
//! let result = pipeline.run(&request)?;
//! println!("{} {:?}", result.tier, result.measurements);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `orthofit::core`: landmarks, handedness, measurements, size table, logging.
//! - `orthofit::calib`: blue calibration square detection.
//! - `orthofit::hand`: estimator adapter, handedness reconciliation, measurement.
//! - `orthofit::mesh`: STL I/O, brace scaling and mirroring, template cache.
//! - [`Pipeline`]: the tiered orchestrator tying them together.

pub use orthofit_calib as calib;
pub use orthofit_core as core;
pub use orthofit_hand as hand;
pub use orthofit_mesh as mesh;

pub use orthofit_core::{Handedness, HandLandmarks, Measurements, SizeClass};

mod annotate;
mod codec;
mod config;
mod last_resort;
mod pipeline;
mod report;

pub use annotate::{annotate, AnnotationStyle};
pub use codec::{decode_image, encode_image, encoded_format, DecodedImage};
pub use config::{ConfigIoError, PipelineConfig};
pub use last_resort::{synthesize_measurements, LastResortParams};
pub use pipeline::{
    OutputImage, Pipeline, PipelineError, PipelineRequest, PipelineResult, Tier,
};
pub use report::{MeshSummary, PipelineReport};
