use std::io::{BufWriter, Seek, SeekFrom, Write};

use crate::error::Result;

/// Default capacity of the write buffer (64KB)
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// A buffered, seekable output stream that tracks its own position
///
/// [`BufWriter`] flushes on every call to [`Seek::stream_position`], which makes
/// asking "where am I" as expensive as a syscall. Writers in this crate ask that
/// question once per record, so the position is tracked here instead and only
/// real seeks reach the underlying handle.
pub struct OutputStream<W: Write + Seek> {
    /// Buffered inner writer
    inner: BufWriter<W>,

    /// Absolute position of the next byte written
    pos: u64,
}
impl<W: Write + Seek> OutputStream<W> {
    /// Wraps `inner`, starting from its current position
    pub fn new(inner: W) -> Result<Self> {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, inner)
    }

    /// Wraps `inner` with a write buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize, mut inner: W) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self {
            inner: BufWriter::with_capacity(capacity, inner),
            pos,
        })
    }

    /// Flushes the buffer and returns the inner writer
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| e.into_error().into())
    }

    /// Returns a reference to the inner writer
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

impl<W: Write + Seek> Write for OutputStream<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Seek> Seek for OutputStream<W> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.pos = self.inner.seek(pos)?;
        Ok(self.pos)
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{DataOutput, Positioned};
    use std::io::Cursor;

    #[test]
    fn test_tracks_position_without_flushing() -> Result<()> {
        let mut stream = OutputStream::new(Cursor::new(Vec::new()))?;
        stream.put_long(0)?;
        stream.put_int(7)?;
        assert_eq!(stream.tell()?, 12);

        // nothing reached the inner writer yet
        assert!(stream.get_ref().get_ref().is_empty());

        stream.seek_to(0)?;
        stream.put_long(12)?;
        assert_eq!(stream.tell()?, 8);

        let bytes = stream.into_inner()?.into_inner();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..8], &12i64.to_be_bytes());
        Ok(())
    }

    #[test]
    fn test_starts_from_inner_position() -> Result<()> {
        let mut inner = Cursor::new(vec![0u8; 4]);
        inner.set_position(4);
        let mut stream = OutputStream::new(inner)?;
        assert_eq!(stream.tell()?, 4);
        stream.put_byte(1)?;
        assert_eq!(stream.into_inner()?.into_inner(), vec![0, 0, 0, 0, 1]);
        Ok(())
    }
}
