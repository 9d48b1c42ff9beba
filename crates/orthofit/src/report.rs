use std::{fs, path::Path};

use orthofit_calib::BoundingBox;
use orthofit_core::{Handedness, Measurements};
use orthofit_mesh::MeshBounds;
use serde::{Deserialize, Serialize};

use crate::{ConfigIoError, PipelineResult, Tier};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSummary {
    pub faces: usize,
    pub vertices: usize,
    pub bounds: Option<MeshBounds>,
}

/// JSON-friendly summary of a [`PipelineResult`] (no image or mesh bytes).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub tier: Tier,
    pub handedness: Handedness,
    #[serde(default)]
    pub raw_handedness: Option<Handedness>,
    pub measurements: Measurements,
    #[serde(default)]
    pub calibration_box: Option<BoundingBox>,
    pub image_annotated: bool,
    #[serde(default)]
    pub mesh: Option<MeshSummary>,
}

impl PipelineReport {
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            tier: result.tier,
            handedness: result.handedness,
            raw_handedness: result.raw_handedness,
            measurements: result.measurements.clone(),
            calibration_box: result.calibration.as_ref().map(|c| c.bbox),
            image_annotated: result.image.is_annotated(),
            mesh: result.mesh.as_ref().map(|m| MeshSummary {
                faces: m.face_count(),
                vertices: m.vertex_count(),
                bounds: m.bounds(),
            }),
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
