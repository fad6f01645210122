//! Error types shared by all readers

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file could not be turned into the structure it is supposed to hold.
///
/// Fatal to the entity being constructed. Every variant names the file.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error(
        "{} is truncated: expected at least {expected} bytes, found {actual}",
        path.display()
    )]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("read failed in {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid layout for {}: {reason}", path.display())]
    InvalidLayout { path: PathBuf, reason: String },
}

impl FormatError {
    pub(crate) fn open(path: &Path, source: io::Error) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid_layout(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidLayout {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Path of the file that failed
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. }
            | Self::Truncated { path, .. }
            | Self::Read { path, .. }
            | Self::InvalidLayout { path, .. } => path,
        }
    }
}

/// Failure to load one frame of an already opened series.
///
/// Recoverable: callers render a zero frame instead and may retry later.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame {index} out of range ({frame_count} frames stored)")]
    OutOfRange { index: u64, frame_count: u64 },

    #[error("I/O error reading frame: {0}")]
    Io(#[from] io::Error),
}
