//! Material ids and their display colours
//!
//! Id `0` marks empty space in voxel maps and "do not draw" for models.
//! [`MaterialId`] cannot hold it, so every caller that turns a raw byte into
//! a drawable material goes through [`MaterialId::new`].

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU8;

/// Linear RGBA colour
pub type Rgba = [f32; 4];

/// Number of materials with a fixed palette entry (ids `1..=8`)
pub const PALETTE_SIZE: usize = 8;

/// Fixed colours for ids `1..=8`, in id order.
pub const PALETTE: [Rgba; PALETTE_SIZE] = [
    [0.0, 0.0, 1.0, 1.0], // blue
    [0.0, 1.0, 0.0, 1.0], // green
    [0.0, 1.0, 1.0, 1.0], // cyan
    [1.0, 0.0, 0.0, 1.0], // red
    [1.0, 0.0, 1.0, 1.0], // magenta
    [1.0, 1.0, 0.0, 1.0], // yellow
    [0.8, 0.8, 0.8, 1.0], // light gray
    [0.5, 0.7, 1.0, 1.0], // light blue
];

/// A non-empty material id (`1..=255`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MaterialId(NonZeroU8);

impl MaterialId {
    /// Returns `None` for the empty material `0`.
    pub fn new(id: u8) -> Option<Self> {
        NonZeroU8::new(id).map(Self)
    }

    /// Raw id value
    pub fn get(self) -> u8 {
        self.0.get()
    }

    /// Index into [`PALETTE`] for ids `1..=8`, `None` above that.
    pub fn palette_slot(self) -> Option<usize> {
        let slot = self.get() as usize - 1;
        (slot < PALETTE_SIZE).then_some(slot)
    }

    /// Display colour.
    ///
    /// Ids past the fixed palette get a red ramp of `id / 256`.
    pub fn color(self) -> Rgba {
        match self.palette_slot() {
            Some(slot) => PALETTE[slot],
            None => [self.get() as f32 / 256.0, 0.0, 0.0, 1.0],
        }
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.get(), f)
    }
}
