//! Planar "scanner" probes
//!
//! A probe samples the field on a 2-D plane and stores one frame every
//! `stride` simulation steps. The backing file is an ordinary frame series
//! whose element count is the plane's width × height.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use crate::error::{FormatError, FrameError};
use crate::series::{FrameLayout, FrameSeries};

/// Placement of a sampling plane in grid units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    /// Plane origin
    pub position: [f32; 3],
    /// Euler rotation in radians (x, y, z)
    pub rotation: [f32; 3],
    /// Samples along the plane's two axes
    pub size: [u32; 2],
}

impl PlaneGeometry {
    /// Number of samples in one frame
    pub fn element_count(&self) -> usize {
        self.size[0] as usize * self.size[1] as usize
    }
}

/// A probe plane and its stored frames
pub struct PlaneProbe<R = File> {
    geometry: PlaneGeometry,
    stride: u32,
    series: FrameSeries<R>,
}

impl PlaneProbe<File> {
    /// Open the probe's output file.
    pub fn open(
        path: impl AsRef<Path>,
        geometry: PlaneGeometry,
        stride: u32,
    ) -> Result<Self, FormatError> {
        let path = path.as_ref();
        if stride == 0 {
            return Err(FormatError::invalid_layout(path, "probe stride is zero"));
        }
        if geometry.element_count() == 0 {
            return Err(FormatError::invalid_layout(path, "probe plane has no samples"));
        }

        let series = FrameSeries::open(path, geometry.element_count())?;
        Ok(Self {
            geometry,
            stride,
            series,
        })
    }
}

impl<R: Read + Seek> PlaneProbe<R> {
    /// Build a probe over an already open stream.
    pub fn from_reader(reader: R, geometry: PlaneGeometry, stride: u32) -> io::Result<Self> {
        if stride == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "probe stride is zero",
            ));
        }

        let series = FrameSeries::from_reader(reader, geometry.element_count())?;
        Ok(Self {
            geometry,
            stride,
            series,
        })
    }

    /// Load a stored frame by file index (not simulation step).
    pub fn load_frame(&mut self, index: u64) -> Result<(), FrameError> {
        self.series.load_frame(index)
    }
}

impl<R> PlaneProbe<R> {
    /// Plane placement
    pub fn geometry(&self) -> &PlaneGeometry {
        &self.geometry
    }

    /// Simulation steps between stored frames
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// File frame holding simulation step `step`
    pub fn file_frame_for_step(&self, step: u64) -> u64 {
        step / self.stride as u64
    }

    /// Number of simulation steps the stored frames span
    pub fn simulated_steps(&self) -> u64 {
        self.series.frame_count() * self.stride as u64
    }

    /// Number of stored frames
    pub fn frame_count(&self) -> u64 {
        self.series.frame_count()
    }

    /// Derived file structure
    pub fn layout(&self) -> &FrameLayout {
        self.series.layout()
    }

    /// Most recently loaded frame, row-major over the plane
    pub fn values(&self) -> &[f32] {
        self.series.values()
    }
}
