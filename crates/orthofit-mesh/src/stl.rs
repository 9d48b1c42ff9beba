//! STL reader and writer.
//!
//! Binary layout: 80-byte header, `u32` triangle count, then per triangle a
//! normal and three vertices as little-endian `f32` triples followed by a
//! `u16` attribute count. ASCII files start with `solid` and list
//! `facet normal / outer loop / vertex ×3 / endloop / endfacet` blocks.
//!
//! Triangle soups are welded on read: corners with bit-identical
//! coordinates share one vertex.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::{BraceMesh, MeshError};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;
const HEADER_TEXT: &[u8] = b"orthofit brace";

/// Read an STL file from disk.
pub fn load_stl(path: impl AsRef<Path>) -> Result<BraceMesh, MeshError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MeshError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => MeshError::Io(e),
    })?;
    let mesh = read_stl(&bytes)?;
    log::debug!(
        "loaded {}: {} faces, {} vertices",
        path.display(),
        mesh.face_count(),
        mesh.vertex_count()
    );
    Ok(mesh)
}

/// Parse STL bytes, choosing binary or ASCII from the content.
///
/// A buffer whose length matches its declared binary triangle count is
/// binary even if the header begins with `solid`.
pub fn read_stl(bytes: &[u8]) -> Result<BraceMesh, MeshError> {
    if declared_binary_len(bytes) == Some(bytes.len()) {
        return read_binary(bytes);
    }
    let head = &bytes[..bytes.len().min(HEADER_LEN)];
    if String::from_utf8_lossy(head).trim_start().starts_with("solid") {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| MeshError::invalid_content(format!("ASCII STL is not UTF-8: {e}")))?;
        return read_ascii(text);
    }
    read_binary(bytes)
}

fn declared_binary_len(bytes: &[u8]) -> Option<usize> {
    let count = bytes.get(HEADER_LEN..HEADER_LEN + 4)?;
    let count = u32::from_le_bytes(count.try_into().ok()?) as usize;
    Some(HEADER_LEN + 4 + count * TRIANGLE_LEN)
}

#[derive(Default)]
struct Welder {
    mesh: BraceMesh,
    index: HashMap<[u64; 3], u32>,
}

impl Welder {
    fn vertex(&mut self, p: Point3<f64>) -> u32 {
        let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
        let mesh = &mut self.mesh;
        *self.index.entry(key).or_insert_with(|| {
            mesh.vertices.push(p);
            (mesh.vertices.len() - 1) as u32
        })
    }

    fn triangle(&mut self, corners: [Point3<f64>; 3]) {
        let face = corners.map(|p| self.vertex(p));
        self.mesh.faces.push(face);
    }
}

fn read_binary(bytes: &[u8]) -> Result<BraceMesh, MeshError> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err(MeshError::InvalidHeader {
            expected: HEADER_LEN + 4,
            got: bytes.len(),
        });
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[HEADER_LEN..HEADER_LEN + 4]);
    let expected = u32::from_le_bytes(count);

    let body = &bytes[HEADER_LEN + 4..];
    let mut welder = Welder::default();
    for tri in body.chunks_exact(TRIANGLE_LEN).take(expected as usize) {
        // skip the stored normal; it is recomputed on write
        let corner = |k: usize| read_point(&tri[12 + 12 * k..24 + 12 * k]);
        welder.triangle([corner(0), corner(1), corner(2)]);
    }
    let got = welder.mesh.face_count() as u32;
    if got < expected {
        return Err(MeshError::InvalidFaceCount { expected, got });
    }
    Ok(welder.mesh)
}

fn read_point(buf: &[u8]) -> Point3<f64> {
    let f = |k: usize| {
        let mut le = [0u8; 4];
        le.copy_from_slice(&buf[4 * k..4 * k + 4]);
        f64::from(f32::from_le_bytes(le))
    };
    Point3::new(f(0), f(1), f(2))
}

fn read_ascii(text: &str) -> Result<BraceMesh, MeshError> {
    let mut welder = Welder::default();
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);
    for (lineno, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "outer" => corners.clear(),
            "vertex" => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(str::parse::<f64>)
                    .collect::<Result<_, _>>()?;
                if coords.len() != 3 {
                    return Err(MeshError::invalid_content(format!(
                        "line {}: vertex needs three coordinates",
                        lineno + 1
                    )));
                }
                corners.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            "endfacet" => {
                if corners.len() != 3 {
                    return Err(MeshError::invalid_content(format!(
                        "line {}: facet has {} vertices",
                        lineno + 1,
                        corners.len()
                    )));
                }
                welder.triangle([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }
    if !corners.is_empty() {
        return Err(MeshError::invalid_content(format!(
            "unterminated facet with {} vertices",
            corners.len()
        )));
    }
    Ok(welder.mesh)
}

fn unit_normal([a, b, c]: [Point3<f64>; 3]) -> Vector3<f64> {
    (b - a)
        .cross(&(c - a))
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

fn put_f32s(out: &mut impl Write, v: [f64; 3]) -> std::io::Result<()> {
    for c in v {
        out.write_all(&(c as f32).to_le_bytes())?;
    }
    Ok(())
}

/// Write `mesh` as binary STL. Faces with invalid indices are skipped.
pub fn write_stl_binary(mesh: &BraceMesh, mut out: impl Write) -> Result<(), MeshError> {
    let triangles: Vec<_> = (0..mesh.face_count())
        .filter_map(|i| mesh.triangle(i))
        .collect();
    let mut header = [0u8; HEADER_LEN];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    out.write_all(&header)?;
    out.write_all(&(triangles.len() as u32).to_le_bytes())?;
    for tri in triangles {
        let n = unit_normal(tri);
        put_f32s(&mut out, [n.x, n.y, n.z])?;
        for p in tri {
            put_f32s(&mut out, [p.x, p.y, p.z])?;
        }
        out.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Write `mesh` as ASCII STL.
pub fn write_stl_ascii(mesh: &BraceMesh, mut out: impl Write) -> Result<(), MeshError> {
    writeln!(out, "solid brace")?;
    for tri in (0..mesh.face_count()).filter_map(|i| mesh.triangle(i)) {
        let n = unit_normal(tri);
        writeln!(out, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(out, "    outer loop")?;
        for p in tri {
            writeln!(out, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(out, "    endloop")?;
        writeln!(out, "  endfacet")?;
    }
    writeln!(out, "endsolid brace")?;
    Ok(())
}

/// Binary STL bytes for `mesh`.
pub fn to_stl_bytes(mesh: &BraceMesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 4 + mesh.face_count() * TRIANGLE_LEN);
    // writing into a Vec cannot fail
    let _ = write_stl_binary(mesh, &mut out);
    out
}

/// Write `mesh` to `path`, binary or ASCII.
pub fn save_stl(mesh: &BraceMesh, path: impl AsRef<Path>, binary: bool) -> Result<(), MeshError> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    if binary {
        write_stl_binary(mesh, &mut out)?;
    } else {
        write_stl_ascii(mesh, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::tetrahedron;
    use approx::assert_relative_eq;

    #[test]
    fn binary_round_trip_welds_vertices() {
        let mesh = tetrahedron().scaled([2.0, 0.5, 4.0]);
        let bytes = to_stl_bytes(&mesh);
        assert_eq!(bytes.len(), HEADER_LEN + 4 + 4 * TRIANGLE_LEN);

        let back = read_stl(&bytes).expect("read");
        assert_eq!(back.face_count(), 4);
        assert_eq!(back.vertex_count(), 4);
        assert_relative_eq!(back.signed_volume(), mesh.signed_volume(), epsilon = 1e-9);
    }

    #[test]
    fn ascii_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("brace.stl");
        save_stl(&tetrahedron(), &path, false).expect("save");

        let text = std::fs::read_to_string(&path).expect("read text");
        assert!(text.starts_with("solid brace"));

        let back = load_stl(&path).expect("load");
        assert_eq!(back.face_count(), 4);
        assert_eq!(back.vertex_count(), 4);
        assert_eq!(back.bounds(), tetrahedron().bounds());
        assert_relative_eq!(back.signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn binary_header_starting_with_solid_is_binary() {
        let mut bytes = to_stl_bytes(&tetrahedron());
        bytes[..5].copy_from_slice(b"solid");
        let back = read_stl(&bytes).expect("read");
        assert_eq!(back.face_count(), 4);
    }

    #[test]
    fn truncated_binary_reports_face_count() {
        let bytes = to_stl_bytes(&tetrahedron());
        let err = read_stl(&bytes[..bytes.len() - 10]).expect_err("truncated");
        assert!(matches!(
            err,
            MeshError::InvalidFaceCount {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn short_buffer_is_invalid_header() {
        let err = read_stl(&[0u8; 20]).expect_err("short");
        assert!(matches!(err, MeshError::InvalidHeader { got: 20, .. }));
    }

    #[test]
    fn malformed_ascii_vertex() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 zero\n";
        assert!(matches!(
            read_stl(text.as_bytes()),
            Err(MeshError::ParseFloat(_))
        ));
    }

    #[test]
    fn ascii_ending_inside_a_facet_is_rejected() {
        let text = "solid x\n\
            facet normal 0 0 1\n outer loop\n\
            vertex 0 0 0\n vertex 1 0 0\n vertex 0 1 0\n\
            endloop\n endfacet\n\
            facet normal 0 0 1\n outer loop\n\
            vertex 0 0 0\n vertex 1 0 0\n";
        let err = read_stl(text.as_bytes()).expect_err("partial facet");
        assert!(matches!(err, MeshError::InvalidContent(_)), "{err}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_stl(dir.path().join("nope.stl")).expect_err("missing");
        assert!(matches!(err, MeshError::FileNotFound { .. }));
    }
}
