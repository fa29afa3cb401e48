use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{ReadError, Result};
use crate::io::DataInput;

/// Smallest capacity a scratch buffer allocates
const MIN_CAPACITY: usize = 64;

/// A reusable, seekable in-memory byte buffer
///
/// Capacity grows geometrically (doubling, starting at 64 bytes) and is never
/// released, so a serializer encoding many records of similar size stops
/// allocating after the first few. [`clear`](Self::clear) only resets the
/// length and position.
///
/// The buffer is both a [`Write`] and a [`Read`] target sharing one position,
/// so records are encoded into it and decoded back out of it through the same
/// [`DataOutput`](crate::io::DataOutput) and [`DataInput`] calls.
#[derive(Debug, Default, Clone)]
pub struct ScratchBuffer {
    data: Vec<u8>,
    pos: usize,
}
impl ScratchBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the contents and rewinds, keeping the allocation
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// Moves the position back to the first byte
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Current read/write position
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the contents with exactly `len` bytes read from `input` and rewinds
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::FileTruncation`] without allocating if fewer than
    /// `len` bytes remain in `input`.
    pub fn fill_from<R: DataInput + ?Sized>(&mut self, input: &mut R, len: usize) -> Result<()> {
        let pos = input.tell()?;
        let end = input.end_position()?;
        if pos.saturating_add(len as u64) > end {
            return Err(ReadError::FileTruncation {
                expected: pos.saturating_add(len as u64),
                found: end,
            }
            .into());
        }
        self.clear();
        self.grow_to(len);
        self.data.resize(len, 0);
        input.get_bytes(&mut self.data)
    }

    /// Ensures room for `needed` bytes in total
    fn grow_to(&mut self, needed: usize) {
        let capacity = self.data.capacity();
        if needed <= capacity {
            return;
        }
        let target = needed.max(capacity.saturating_mul(2)).max(MIN_CAPACITY);
        self.data.reserve_exact(target - self.data.len());
    }
}

impl Write for ScratchBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let end = self.pos + buf.len();
        self.grow_to(end);
        if self.pos > self.data.len() {
            self.data.resize(self.pos, 0);
        }

        // overwrite whatever is under the cursor, then append the rest
        let overlap = (self.data.len() - self.pos).min(buf.len());
        self.data[self.pos..self.pos + overlap].copy_from_slice(&buf[..overlap]);
        self.data.extend_from_slice(&buf[overlap..]);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ScratchBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.get(self.pos..).unwrap_or_default();
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for ScratchBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => self.pos as i128 + i128::from(delta),
            SeekFrom::End(delta) => self.data.len() as i128 + i128::from(delta),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = usize::try_from(target)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek out of range"))?;
        Ok(self.pos as u64)
    }
}
