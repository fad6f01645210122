//! Frame-indexed scalar time series
//!
//! A series file is a raw concatenation of frames, each `element_count`
//! little-endian `f32` values, with no header or trailer. The number of
//! frames is whatever the file length allows; trailing bytes short of a
//! whole frame are ignored.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace, warn};

use crate::error::{FormatError, FrameError};

/// Size of one stored element (`f32`)
pub const ELEMENT_BYTE_SIZE: u64 = 4;

/// Structure of a series file, derived once from its length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameLayout {
    /// Values per frame
    pub element_count: usize,
    /// Bytes per value
    pub element_byte_size: u64,
    /// Byte offset of frame 0
    pub data_origin_offset: u64,
    /// Whole frames available after the origin
    pub frame_count: u64,
}

impl FrameLayout {
    /// Derive the layout of a stream of `total_len` bytes whose frames start
    /// at `data_origin_offset`. `element_count` must be non-zero.
    pub fn derive(total_len: u64, data_origin_offset: u64, element_count: usize) -> Self {
        let frame_bytes = element_count as u64 * ELEMENT_BYTE_SIZE;
        let frame_count = total_len.saturating_sub(data_origin_offset) / frame_bytes;
        Self {
            element_count,
            element_byte_size: ELEMENT_BYTE_SIZE,
            data_origin_offset,
            frame_count,
        }
    }

    /// Bytes per frame
    pub fn frame_bytes(&self) -> u64 {
        self.element_count as u64 * self.element_byte_size
    }

    /// Absolute byte offset of a frame
    pub fn frame_offset(&self, index: u64) -> u64 {
        self.data_origin_offset + index * self.frame_bytes()
    }

    /// Bytes after the last whole frame of a stream of `total_len` bytes
    pub fn trailing_bytes(&self, total_len: u64) -> u64 {
        total_len.saturating_sub(self.frame_offset(self.frame_count))
    }
}

/// Random-access reader over a frame series.
///
/// Owns its stream and a reusable frame buffer. [`load_frame`](Self::load_frame)
/// refreshes the buffer in place; on failure the caller must not trust the
/// buffer for that frame.
pub struct FrameSeries<R = File> {
    reader: R,
    layout: FrameLayout,
    values: Vec<f32>,
    scratch: Vec<u8>,
}

impl FrameSeries<File> {
    /// Open a series file whose frames start at byte 0.
    pub fn open(path: impl AsRef<Path>, element_count: usize) -> Result<Self, FormatError> {
        let path = path.as_ref();
        if element_count == 0 {
            return Err(FormatError::invalid_layout(path, "element count is zero"));
        }

        let file = File::open(path).map_err(|e| FormatError::open(path, e))?;
        let series = Self::from_reader(file, element_count).map_err(|e| FormatError::read(path, e))?;

        debug!(
            "Opened series {:?}: {} elements/frame, {} frames",
            path, element_count, series.layout.frame_count
        );

        Ok(series)
    }
}

impl<R: Read + Seek> FrameSeries<R> {
    /// Wrap an open stream.
    ///
    /// The current stream position becomes the data origin, so a caller that
    /// has already consumed a leading block hands over the rest as frames.
    pub fn from_reader(mut reader: R, element_count: usize) -> io::Result<Self> {
        if element_count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "element count is zero",
            ));
        }

        let origin = reader.stream_position()?;
        let total_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(origin))?;

        let layout = FrameLayout::derive(total_len, origin, element_count);
        let trailing = layout.trailing_bytes(total_len);
        if trailing > 0 {
            warn!(
                "Series has {} trailing bytes after {} whole frames; ignoring them",
                trailing, layout.frame_count
            );
        }

        Ok(Self {
            reader,
            layout,
            values: vec![0.0; element_count],
            scratch: vec![0u8; layout.frame_bytes() as usize],
        })
    }

    /// Read frame `index` into the frame buffer.
    ///
    /// An out-of-range index leaves the buffer untouched.
    pub fn load_frame(&mut self, index: u64) -> Result<(), FrameError> {
        if index >= self.layout.frame_count {
            return Err(FrameError::OutOfRange {
                index,
                frame_count: self.layout.frame_count,
            });
        }

        let offset = self.layout.frame_offset(index);
        trace!("Loading frame {} at byte {}", index, offset);

        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.read_exact(&mut self.scratch)?;
        LittleEndian::read_f32_into(&self.scratch, &mut self.values);

        Ok(())
    }
}

impl<R> FrameSeries<R> {
    /// Derived file structure
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Number of whole frames stored
    pub fn frame_count(&self) -> u64 {
        self.layout.frame_count
    }

    /// Values per frame
    pub fn element_count(&self) -> usize {
        self.layout.element_count
    }

    /// Most recently loaded frame
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    fn series_bytes(values: &[f32]) -> Vec<u8> {
        let mut buf = Vec::new();
        for v in values {
            buf.write_f32::<LittleEndian>(*v).unwrap();
        }
        buf
    }

    #[test]
    fn test_layout_floor_division() {
        let layout = FrameLayout::derive(100, 0, 3);
        assert_eq!(layout.frame_bytes(), 12);
        assert_eq!(layout.frame_count, 8);
        assert_eq!(layout.trailing_bytes(100), 4);
    }

    #[test]
    fn test_layout_with_origin() {
        let layout = FrameLayout::derive(58, 10, 2);
        assert_eq!(layout.frame_count, 6);
        assert_eq!(layout.frame_offset(2), 26);
        assert_eq!(FrameLayout::derive(4, 10, 2).frame_count, 0);
    }

    #[test]
    fn test_load_frames() {
        let bytes = series_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut series = FrameSeries::from_reader(Cursor::new(bytes), 2).unwrap();

        assert_eq!(series.frame_count(), 3);
        series.load_frame(1).unwrap();
        assert_eq!(series.values(), &[3.0, 4.0]);
        series.load_frame(0).unwrap();
        assert_eq!(series.values(), &[1.0, 2.0]);
    }

    #[test]
    fn test_out_of_range_leaves_buffer() {
        let bytes = series_bytes(&[1.0, 2.0, 3.0, 4.0]);
        let mut series = FrameSeries::from_reader(Cursor::new(bytes), 2).unwrap();
        series.load_frame(1).unwrap();

        let err = series.load_frame(2).unwrap_err();
        assert!(matches!(
            err,
            FrameError::OutOfRange {
                index: 2,
                frame_count: 2
            }
        ));
        assert_eq!(series.values(), &[3.0, 4.0]);
    }

    /// Stream whose reads fail once `limit` bytes have been consumed
    struct FailingAfter {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Read for FailingAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let position = self.inner.position();
            if position >= self.limit {
                return Err(io::Error::new(io::ErrorKind::Other, "device lost"));
            }
            let allowed = buf.len().min((self.limit - position) as usize);
            self.inner.read(&mut buf[..allowed])
        }
    }

    impl Seek for FailingAfter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_read_failure_mid_frame() {
        let reader = FailingAfter {
            inner: Cursor::new(series_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
            limit: 20,
        };
        let mut series = FrameSeries::from_reader(reader, 2).unwrap();
        assert_eq!(series.frame_count(), 3);

        series.load_frame(1).unwrap();
        let err = series.load_frame(2).unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
        // Partial frame is never decoded
        assert_eq!(series.values(), &[3.0, 4.0]);
    }

    #[test]
    fn test_origin_is_current_position() {
        let mut bytes = vec![0xAAu8; 8];
        bytes.extend(series_bytes(&[7.0, 8.0, 9.0]));
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(8);

        let mut series = FrameSeries::from_reader(cursor, 1).unwrap();
        assert_eq!(series.layout().data_origin_offset, 8);
        assert_eq!(series.frame_count(), 3);
        series.load_frame(2).unwrap();
        assert_eq!(series.values(), &[9.0]);
    }

    #[test]
    fn test_zero_elements_rejected() {
        assert!(FrameSeries::from_reader(Cursor::new(vec![0u8; 16]), 0).is_err());
    }

    #[test]
    fn test_initial_buffer_is_zero() {
        let series = FrameSeries::from_reader(Cursor::new(series_bytes(&[5.0; 4])), 4).unwrap();
        assert_eq!(series.values(), &[0.0; 4]);
    }
}
