use std::path::PathBuf;

/// Errors while reading, validating or transforming a brace mesh.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("template not found: {path}")]
    FileNotFound { path: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid STL header: expected at least {expected} bytes, got {got}")]
    InvalidHeader { expected: usize, got: usize },
    #[error("binary STL declares {expected} triangles, only {got} present")]
    InvalidFaceCount { expected: u32, got: u32 },
    #[error("invalid STL content: {0}")]
    InvalidContent(String),
    #[error("float parsing error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("vertex {0} is not finite")]
    NonFiniteVertex(usize),
    #[error("face {face} references vertex {index} out of range")]
    FaceIndexOutOfRange { face: usize, index: u32 },
    #[error("wrist width must be finite and > 0 (got {0})")]
    NonPositiveWristWidth(f64),
    #[error("template circumference must be finite and > 0 (got {0})")]
    InvalidTemplateCircumference(f64),
    #[error("circumference ratio must be finite and > 0 (got {0})")]
    InvalidCircumferenceRatio(f64),
}

impl MeshError {
    pub(crate) fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent(message.into())
    }
}
