//! Voxel material maps
//!
//! A map is `depth` slices of `width × height` bytes, one material id per
//! voxel, rows stored y-outer / x-inner. Depth is not stored anywhere: it is
//! the file length divided by the slice size, and a trailing partial slice is
//! dropped without being read.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::FormatError;
use crate::material::MaterialId;

/// One non-empty voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voxel {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub material: MaterialId,
}

impl Voxel {
    /// Grid position as floats, for instance translation
    pub fn position(&self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

/// Sparse voxel map: only non-empty cells, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoxelGrid {
    /// (x, y, z) extent; z is derived from the file length
    pub dims: [u32; 3],
    pub voxels: Vec<Voxel>,
}

impl VoxelGrid {
    /// Decode a map from a stream of known length.
    pub fn read<R: Read>(reader: &mut R, total_len: u64, dims_xy: [u32; 2]) -> io::Result<Self> {
        let slice_len = dims_xy[0] as u64 * dims_xy[1] as u64;
        if slice_len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "voxel map slice has zero size",
            ));
        }

        let depth = total_len / slice_len;
        let remainder = total_len % slice_len;
        if remainder > 0 {
            warn!(
                "Voxel map has a partial slice of {} bytes after {} slices; dropping it",
                remainder, depth
            );
        }
        let depth = u32::try_from(depth).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "voxel map depth exceeds u32")
        })?;

        let mut voxels = Vec::new();
        let mut slice = vec![0u8; slice_len as usize];

        for z in 0..depth {
            reader.read_exact(&mut slice)?;

            let rows = slice.chunks_exact(dims_xy[0] as usize);
            for (y, row) in (0u32..).zip(rows) {
                for (x, &byte) in (0u32..).zip(row) {
                    if let Some(material) = MaterialId::new(byte) {
                        voxels.push(Voxel { x, y, z, material });
                    }
                }
            }
        }

        Ok(Self {
            dims: [dims_xy[0], dims_xy[1], depth],
            voxels,
        })
    }

    /// Number of drawable instances
    pub fn instance_count(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Voxel count per material id
    pub fn material_histogram(&self) -> BTreeMap<MaterialId, usize> {
        let mut histogram = BTreeMap::new();
        for voxel in &self.voxels {
            *histogram.entry(voxel.material).or_insert(0) += 1;
        }
        histogram
    }
}

/// Decode a voxel map file given its x / y extent.
pub fn decode_voxel_map(path: impl AsRef<Path>, dims_xy: [u32; 2]) -> Result<VoxelGrid, FormatError> {
    let path = path.as_ref();
    if dims_xy[0] == 0 || dims_xy[1] == 0 {
        return Err(FormatError::invalid_layout(path, "voxel map slice has zero size"));
    }

    let file = File::open(path).map_err(|e| FormatError::open(path, e))?;
    let total_len = file
        .metadata()
        .map_err(|e| FormatError::read(path, e))?
        .len();

    let grid = VoxelGrid::read(&mut BufReader::new(file), total_len, dims_xy)
        .map_err(|e| FormatError::read(path, e))?;

    debug!(
        "Decoded voxel map {:?}: {}x{}x{}, {} instances",
        path,
        grid.dims[0],
        grid.dims[1],
        grid.dims[2],
        grid.instance_count()
    );

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(bytes: &[u8], dims_xy: [u32; 2]) -> VoxelGrid {
        VoxelGrid::read(&mut Cursor::new(bytes), bytes.len() as u64, dims_xy).unwrap()
    }

    #[test]
    fn test_depth_from_length() {
        assert_eq!(decode(&[0u8; 16], [2, 2]).dims, [2, 2, 4]);
        assert_eq!(decode(&[0u8; 15], [2, 2]).dims, [2, 2, 3]);
    }

    #[test]
    fn test_partial_slice_is_not_read() {
        let mut bytes = vec![0u8; 12];
        bytes.extend([7u8, 7, 7]);
        let grid = decode(&bytes, [2, 2]);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_row_major_positions() {
        // 3 x 2 slices, two of them
        let bytes = [
            0, 0, 0, //
            0, 5, 0, //
            1, 0, 0, //
            0, 0, 200,
        ];
        let grid = decode(&bytes, [3, 2]);

        assert_eq!(grid.dims, [3, 2, 2]);
        assert_eq!(grid.instance_count(), 3);
        let coords: Vec<_> = grid
            .voxels
            .iter()
            .map(|v| (v.x, v.y, v.z, v.material.get()))
            .collect();
        assert_eq!(coords, vec![(1, 1, 0, 5), (0, 0, 1, 1), (2, 1, 1, 200)]);
    }

    #[test]
    fn test_zero_bytes_never_emitted() {
        let bytes: Vec<u8> = (0..64).map(|i| (i % 3) as u8).collect();
        let grid = decode(&bytes, [4, 4]);
        assert!(grid.voxels.iter().all(|v| v.material.get() != 0));
        assert_eq!(grid.instance_count(), bytes.iter().filter(|&&b| b != 0).count());
    }

    #[test]
    fn test_histogram() {
        let grid = decode(&[1, 2, 2, 0, 9, 2, 0, 0], [2, 2]);
        let histogram = grid.material_histogram();
        assert_eq!(histogram[&MaterialId::new(2).unwrap()], 3);
        assert_eq!(histogram[&MaterialId::new(9).unwrap()], 1);
        assert_eq!(histogram.len(), 3);
    }

    #[test]
    fn test_zero_slice_rejected() {
        assert!(VoxelGrid::read(&mut Cursor::new(vec![1u8; 4]), 4, [0, 4]).is_err());
    }
}
