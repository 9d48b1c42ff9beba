//! Plausible measurements when nothing else worked.
//!
//! Values are picked inside fixed adult ranges with a jitter derived from
//! the scale and image size, so the same photo always yields the same
//! answer.

use orthofit_core::{round_cm, Measurements};
use orthofit_hand::MeasureParams;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastResortParams {
    /// Inclusive wrist width range, cm.
    pub wrist_range_cm: [f64; 2],
    /// Inclusive hand length range, cm.
    pub length_range_cm: [f64; 2],
}

impl Default for LastResortParams {
    fn default() -> Self {
        Self {
            wrist_range_cm: [6.0, 8.5],
            length_range_cm: [16.0, 20.0],
        }
    }
}

impl LastResortParams {
    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        for [lo, hi] in [self.wrist_range_cm, self.length_range_cm] {
            if !(lo.is_finite() && hi.is_finite() && 0.0 < lo && lo <= hi) {
                return Err(PipelineError::InvalidLastResortRange { lo, hi });
            }
        }
        Ok(())
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn unit(state: &mut u64) -> f64 {
    (splitmix64(state) >> 11) as f64 / (1u64 << 53) as f64
}

fn lerp([lo, hi]: [f64; 2], t: f64) -> f64 {
    lo + (hi - lo) * t
}

/// Deterministic measurement set for the last-resort tier.
///
/// Palm width keeps the palm/wrist multiplier ratio of `measure`.
pub fn synthesize_measurements(
    scale_px_per_cm: f64,
    width: u32,
    height: u32,
    params: &LastResortParams,
    measure: &MeasureParams,
) -> Measurements {
    let mut state = scale_px_per_cm.to_bits() ^ (u64::from(width) << 32 | u64::from(height));
    let wrist_width_cm = round_cm(lerp(params.wrist_range_cm, unit(&mut state)));
    let hand_length_cm = round_cm(lerp(params.length_range_cm, unit(&mut state)));
    let palm_width_cm = round_cm(wrist_width_cm * measure.palm_factor / measure.wrist_factor);
    Measurements {
        wrist_width_cm,
        palm_width_cm,
        hand_length_cm,
        scale_px_per_cm,
        size_class: measure.size_table.classify(wrist_width_cm),
        base_distance_px: None,
    }
}
