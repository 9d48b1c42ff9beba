//! Reference brace mesh handling.
//!
//! A [`BraceMesh`] template is read once from STL (binary or ASCII) and
//! kept read-only in a [`TemplateStore`]. Per patient, [`fit_brace`]
//! derives a scale factor from the wrist width, produces a scaled copy and
//! mirrors it for left hands. The template itself is never modified.
//!
//! ```no_run
//! use orthofit_core::Handedness;
//! use orthofit_mesh::{fit_brace, to_stl_bytes, MeshParams, TemplateStore};
//!
//! # fn main() -> Result<(), orthofit_mesh::MeshError> {
//! let store = TemplateStore::new();
//! let template = store.get("brace.stl")?;
//! let brace = fit_brace(&template, 7.2, Handedness::Left, &MeshParams::default())?;
//! let stl = to_stl_bytes(&brace);
//! # let _ = stl;
//! # Ok(())
//! # }
//! ```

mod error;
mod mesh;
mod scale;
mod stl;
mod store;

pub use error::MeshError;
pub use mesh::{Axis, BraceMesh, MeshBounds};
pub use scale::{fit_brace, scale_factor, MeshParams, ThicknessMode};
pub use stl::{load_stl, read_stl, save_stl, to_stl_bytes, write_stl_ascii, write_stl_binary};
pub use store::TemplateStore;
