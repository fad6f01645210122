//! Binary triangulated-solid loading
//!
//! File layout (little-endian):
//!
//! ```text
//! UINT8[80]    header, ignored
//! UINT32       triangle count
//! per triangle (50 bytes):
//!     REAL32[3]  face normal
//!     REAL32[9]  three vertices
//!     UINT16     attribute byte count, ignored
//! ```
//!
//! Vertices are never welded: every triangle contributes three fresh
//! vertices, three copies of its face normal and three sequential indices.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;

use crate::error::FormatError;

/// Size of the ignored file header
pub const HEADER_LEN: u64 = 80;

/// Size of one triangle record
pub const TRIANGLE_RECORD_LEN: u64 = 50;

/// Upper bound on speculative preallocation when the count is untrusted
const MAX_PREALLOC_TRIANGLES: usize = 1 << 20;

/// Flat, renderer-ready triangle list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// x, y, z per vertex
    pub vertices: Vec<f32>,
    /// x, y, z per vertex, replicated from the face normal
    pub normals: Vec<f32>,
    /// Three consecutive indices per triangle
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Parse a mesh from a stream positioned at the start of the header.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut header = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header)?;

        let triangle_count = reader.read_u32::<LittleEndian>()?;
        if triangle_count.checked_mul(3).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("triangle count {} overflows the index range", triangle_count),
            ));
        }
        let triangle_count = triangle_count as usize;
        let reserve = triangle_count.min(MAX_PREALLOC_TRIANGLES);

        let mut mesh = Mesh {
            vertices: Vec::with_capacity(reserve * 9),
            normals: Vec::with_capacity(reserve * 9),
            indices: Vec::with_capacity(reserve * 3),
        };

        let mut next_index = 0u32;
        let mut normal = [0.0f32; 3];
        let mut corners = [0.0f32; 9];

        for _ in 0..triangle_count {
            reader.read_f32_into::<LittleEndian>(&mut normal)?;
            reader.read_f32_into::<LittleEndian>(&mut corners)?;
            reader.read_u16::<LittleEndian>()?;

            mesh.vertices.extend_from_slice(&corners);
            for _ in 0..3 {
                mesh.normals.extend_from_slice(&normal);
                mesh.indices.push(next_index);
                next_index += 1;
            }
        }

        Ok(mesh)
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        if self.vertices.is_empty() {
            return None;
        }

        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for vertex in self.vertices.chunks_exact(3) {
            for i in 0..3 {
                min[i] = min[i].min(vertex[i]);
                max[i] = max[i].max(vertex[i]);
            }
        }
        Some((min, max))
    }
}

/// Expected file size for a given triangle count
pub fn expected_file_len(triangle_count: u32) -> u64 {
    HEADER_LEN + 4 + TRIANGLE_RECORD_LEN * triangle_count as u64
}

/// Load a binary mesh file.
///
/// The declared triangle count is checked against the file length before any
/// triangle is parsed, so a truncated file never yields a partial mesh.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, FormatError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FormatError::open(path, e))?;
    let actual = file
        .metadata()
        .map_err(|e| FormatError::read(path, e))?
        .len();

    let mut reader = BufReader::new(file);

    if actual < HEADER_LEN + 4 {
        return Err(FormatError::Truncated {
            path: path.to_path_buf(),
            expected: HEADER_LEN + 4,
            actual,
        });
    }

    let declared = {
        let mut header = [0u8; HEADER_LEN as usize];
        reader
            .read_exact(&mut header)
            .and_then(|_| reader.read_u32::<LittleEndian>())
            .map_err(|e| FormatError::read(path, e))?
    };

    let expected = expected_file_len(declared);
    if actual < expected {
        return Err(FormatError::Truncated {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }

    reader.rewind().map_err(|e| FormatError::read(path, e))?;
    let mesh = Mesh::read(&mut reader).map_err(|e| FormatError::read(path, e))?;

    debug!(
        "Loaded mesh {:?}: {} triangles, {} vertices",
        path,
        mesh.triangle_count(),
        mesh.vertex_count()
    );

    Ok(mesh)
}
