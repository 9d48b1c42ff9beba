use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::MeshError;

/// Coordinate axis of the brace frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Axis-aligned bounding box of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshBounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl MeshBounds {
    pub fn size(&self) -> [f64; 3] {
        let d = self.max - self.min;
        [d.x, d.y, d.z]
    }
}

/// Indexed triangle mesh with counter-clockwise (outward) winding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BraceMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[u32; 3]>,
}

impl BraceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Triangle corners of face `i`, if its indices are valid.
    pub fn triangle(&self, i: usize) -> Option<[Point3<f64>; 3]> {
        let [a, b, c] = *self.faces.get(i)?;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }

    pub fn bounds(&self) -> Option<MeshBounds> {
        let first = *self.vertices.first()?;
        let (min, max) = self
            .vertices
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some(MeshBounds { min, max })
    }

    /// Signed enclosed volume; positive for a closed mesh with outward winding.
    pub fn signed_volume(&self) -> f64 {
        (0..self.faces.len())
            .filter_map(|i| self.triangle(i))
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    /// Reject meshes that cannot be scaled or exported.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        if let Some(i) = self
            .vertices
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(MeshError::NonFiniteVertex(i));
        }
        let n = self.vertices.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&idx| idx as usize >= n) {
                return Err(MeshError::FaceIndexOutOfRange { face, index });
            }
        }
        Ok(())
    }

    /// New mesh with every vertex scaled per axis about the origin.
    pub fn scaled(&self, factors: [f64; 3]) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|p| Point3::new(p.x * factors[0], p.y * factors[1], p.z * factors[2]))
            .collect();
        Self {
            vertices,
            faces: self.faces.clone(),
        }
    }

    /// New mesh reflected across the plane normal to `axis`.
    ///
    /// A reflection flips orientation, so each face swaps two indices to
    /// keep the winding outward.
    pub fn mirrored(&self, axis: Axis) -> Self {
        let k = axis.index();
        let vertices = self
            .vertices
            .iter()
            .map(|p| {
                let mut q = *p;
                q[k] = -q[k];
                q
            })
            .collect();
        let faces = self.faces.iter().map(|&[a, b, c]| [a, c, b]).collect();
        Self { vertices, faces }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit right tetrahedron with outward winding.
    pub(crate) fn tetrahedron() -> BraceMesh {
        BraceMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            faces: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        }
    }

    #[test]
    fn tetrahedron_volume_positive() {
        assert_relative_eq!(tetrahedron().signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn identity_scale_is_exact() {
        let mesh = tetrahedron();
        let same = mesh.scaled([1.0; 3]);
        assert_eq!(same, mesh);
    }

    #[test]
    fn mirror_is_involutive() {
        let mesh = tetrahedron().scaled([1.7, 0.3, 2.0]);
        let twice = mesh.mirrored(Axis::X).mirrored(Axis::X);
        for (a, b) in mesh.vertices.iter().zip(&twice.vertices) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        assert_eq!(twice.faces, mesh.faces);
    }

    #[test]
    fn mirror_keeps_outward_winding() {
        let mirrored = tetrahedron().mirrored(Axis::X);
        assert_relative_eq!(mirrored.signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
        assert!(mirrored.vertices.iter().all(|p| p.x <= 0.0));
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let b = tetrahedron().scaled([2.0, 3.0, 4.0]).bounds().expect("bounds");
        assert_eq!(b.size(), [2.0, 3.0, 4.0]);
        assert!(BraceMesh::new().bounds().is_none());
    }

    #[test]
    fn validate_flags_bad_meshes() {
        assert!(tetrahedron().validate().is_ok());
        assert!(matches!(BraceMesh::new().validate(), Err(MeshError::EmptyMesh)));

        let mut nan = tetrahedron();
        nan.vertices[2].y = f64::NAN;
        assert!(matches!(nan.validate(), Err(MeshError::NonFiniteVertex(2))));

        let mut dangling = tetrahedron();
        dangling.faces.push([0, 1, 9]);
        assert!(matches!(
            dangling.validate(),
            Err(MeshError::FaceIndexOutOfRange { face: 4, index: 9 })
        ));
    }
}
