//! Readers for time-series simulation output
//!
//! This crate parses the binary files a field simulation leaves behind and
//! exposes them in a shape a renderer can upload directly:
//!
//! - [`mesh`]: binary triangulated solids into flat vertex / normal / index buffers
//! - [`series`]: header-less scalar frame series with random-access frame loads
//! - [`probe`]: planar "scanner" probes backed by a frame series
//! - [`voxel`]: byte-per-voxel material maps into sparse instance lists
//! - [`material`]: material ids and their display colours
//!
//! None of the formats carries an explicit header describing its structure.
//! Frame counts and voxel depth are derived from the file length.

pub mod error;
pub mod material;
pub mod mesh;
pub mod probe;
pub mod series;
pub mod voxel;

// Re-export commonly used types
pub use error::{FormatError, FrameError};
pub use material::{MaterialId, Rgba};
pub use mesh::{load_mesh, Mesh};
pub use probe::{PlaneGeometry, PlaneProbe};
pub use series::{FrameLayout, FrameSeries, ELEMENT_BYTE_SIZE};
pub use voxel::{decode_voxel_map, Voxel, VoxelGrid};

/// Result type for file ingestion
pub type Result<T> = std::result::Result<T, FormatError>;
