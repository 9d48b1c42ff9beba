//! JSON configuration holding every empirical constant of the pipeline.

use std::{fs, path::Path};

use orthofit_calib::CalibrationParams;
use orthofit_hand::{MeasureParams, RefineParams};
use orthofit_mesh::MeshParams;
use serde::{Deserialize, Serialize};

use crate::{AnnotationStyle, LastResortParams, PipelineError};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Pipeline configuration; missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub calibration: CalibrationParams,
    /// Scale used when no calibration square is found.
    pub fallback_scale_px_per_cm: f64,
    pub measure: MeasureParams,
    pub refine: RefineParams,
    pub mesh: MeshParams,
    pub last_resort: LastResortParams,
    pub annotation: AnnotationStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationParams::default(),
            fallback_scale_px_per_cm: 67.92,
            measure: MeasureParams::default(),
            refine: RefineParams::default(),
            mesh: MeshParams::default(),
            last_resort: LastResortParams::default(),
            annotation: AnnotationStyle::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        self.calibration.validate()?;
        let s = self.fallback_scale_px_per_cm;
        if !s.is_finite() || s <= 0.0 {
            return Err(PipelineError::InvalidFallbackScale(s));
        }
        self.measure
            .validate()
            .map_err(PipelineError::InvalidMeasureParams)?;
        self.refine
            .validate()
            .map_err(PipelineError::InvalidRefineParams)?;
        self.mesh
            .validate()
            .map_err(PipelineError::InvalidMeshParams)?;
        self.last_resort.validate()?;
        Ok(())
    }
}
