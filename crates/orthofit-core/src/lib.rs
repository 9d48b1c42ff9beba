//! Core types for single-photo hand measurement and brace sizing.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any image decoder, pose estimator or mesh format.

mod color;
mod landmarks;
mod logger;
mod measurements;

pub use color::{rgb_to_hsv, rgb_to_ycrcb, Hsv};
pub use landmarks::{landmark, HandLandmarks, Handedness, Landmark, LANDMARK_COUNT};
pub use measurements::{round_cm, Measurements, SizeBand, SizeClass, SizeTable};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, parse_level, LOG_ENV};
