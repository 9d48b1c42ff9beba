use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{load_stl, BraceMesh, MeshError};

/// Process-lifetime cache of read-only template meshes, keyed by path.
///
/// A template is read from disk on first use and shared afterwards. Failed
/// loads are returned to the caller and retried on the next request.
#[derive(Debug, Default)]
pub struct TemplateStore {
    cache: Mutex<HashMap<PathBuf, Arc<BraceMesh>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached template for `path`, loading and validating it if needed.
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Arc<BraceMesh>, MeshError> {
        let path = path.as_ref();
        if let Some(mesh) = self.lock().get(path) {
            return Ok(Arc::clone(mesh));
        }

        // loaded outside the lock; a concurrent first load of the same path
        // keeps whichever entry landed first
        let mesh = load_stl(path)?;
        mesh.validate()?;
        let mesh = Arc::new(mesh);
        let entry = self
            .lock()
            .entry(path.to_path_buf())
            .or_insert(mesh)
            .clone();
        log::info!(
            "template {} cached ({} faces)",
            path.display(),
            entry.face_count()
        );
        Ok(entry)
    }

    /// Register an in-memory template under `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, mesh: BraceMesh) -> Arc<BraceMesh> {
        let mesh = Arc::new(mesh);
        self.lock().insert(path.into(), Arc::clone(&mesh));
        mesh
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<BraceMesh>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
