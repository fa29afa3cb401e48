use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;

use crate::error::{ReadError, Result};

/// A cursor over the bytes of a [`FileView`]
///
/// Positions are relative to the start of the view.
pub type ViewCursor<'a> = Cursor<&'a [u8]>;

/// A bounded, read-only window `[start, end)` over a memory-mapped file
///
/// Views are cheap to clone and share the same mapping, so independent readers
/// (one per thread) can each hold their own view and cursor.
#[derive(Clone)]
pub struct FileView {
    /// Memory mapped file contents, wrapped in Arc for thread-safe sharing
    mmap: Arc<Mmap>,

    /// Absolute start of the view in the mapping
    start: usize,

    /// Absolute end (exclusive) of the view in the mapping
    end: usize,
}
impl FileView {
    /// Memory-maps the file at `path` and returns a view over all of it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Verify input file is a file before attempting to map
        let file = File::open(path)?;
        if !file.metadata()?.is_file() {
            return Err(ReadError::IncompatibleFile.into());
        }

        // Safety: the file is open and containers are never modified after they are finished
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::from_mmap(Arc::new(mmap)))
    }

    /// Returns a view over an entire existing mapping
    #[must_use]
    pub fn from_mmap(mmap: Arc<Mmap>) -> Self {
        let end = mmap.len();
        Self {
            mmap,
            start: 0,
            end,
        }
    }

    /// Number of bytes covered by the view
    #[must_use]
    pub fn size(&self) -> u64 {
        (self.end - self.start) as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Absolute offset of the view in the underlying file
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start as u64
    }

    /// The bytes covered by the view
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[self.start..self.end]
    }

    /// Returns the sub-view covering `[start, end)` relative to this view
    pub fn subview(&self, start: u64, end: u64) -> Result<Self> {
        if start > end || end > self.size() {
            return Err(ReadError::FileTruncation {
                expected: end.max(start),
                found: self.size(),
            }
            .into());
        }
        Ok(Self {
            mmap: self.mmap.clone(),
            start: self.start + start as usize,
            end: self.start + end as usize,
        })
    }

    /// Returns the sub-view starting at `start` and running to the end of this view
    pub fn tail(&self, start: u64) -> Result<Self> {
        self.subview(start, self.size())
    }

    /// Returns a cursor positioned at the start of the view
    #[must_use]
    pub fn cursor(&self) -> ViewCursor<'_> {
        Cursor::new(self.as_bytes())
    }

    /// Reads the bytes `[rel, rel + N)` relative to the view
    fn fixed<const N: usize>(&self, rel: u64) -> Result<&[u8]> {
        let end = rel.checked_add(N as u64).filter(|&end| end <= self.size());
        match end {
            Some(end) => Ok(&self.as_bytes()[rel as usize..end as usize]),
            None => Err(ReadError::FileTruncation {
                expected: rel.saturating_add(N as u64),
                found: self.size(),
            }
            .into()),
        }
    }

    /// Positioned 4-byte read relative to the view
    pub fn get_int(&self, rel: u64) -> Result<i32> {
        Ok(BigEndian::read_i32(self.fixed::<4>(rel)?))
    }

    /// Positioned 8-byte read relative to the view
    pub fn get_long(&self, rel: u64) -> Result<i64> {
        Ok(BigEndian::read_i64(self.fixed::<8>(rel)?))
    }
}
