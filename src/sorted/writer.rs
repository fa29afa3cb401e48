use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, WriteError};
use crate::io::{DataOutput, OutputStream};

/// Writes a sorted integer array
///
/// Values must be appended in non-decreasing order.
pub struct SortedIntWriter<W: Write + Seek> {
    inner: OutputStream<W>,
    last: Option<i32>,
    len: usize,
}
impl SortedIntWriter<File> {
    /// Creates (or truncates) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(File::create(path)?)
    }
}
impl<W: Write + Seek> SortedIntWriter<W> {
    pub fn new(inner: W) -> Result<Self> {
        Ok(Self {
            inner: OutputStream::new(inner)?,
            last: None,
            len: 0,
        })
    }

    /// Appends one value
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::UnsortedValue`] if `value` is smaller than the
    /// previous value. Nothing is written in that case.
    pub fn push(&mut self, value: i32) -> Result<()> {
        if let Some(prev) = self.last {
            if value < prev {
                return Err(WriteError::UnsortedValue { prev, next: value }.into());
            }
        }
        self.inner.put_int(value)?;
        self.last = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Appends every value of `values`, stopping at the first out-of-order one
    pub fn extend<I: IntoIterator<Item = i32>>(&mut self, values: I) -> Result<()> {
        values.into_iter().try_for_each(|value| self.push(value))
    }

    /// Number of values written
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flushes and returns the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        debug!(elements = self.len, "finished sorted array");
        self.inner.into_inner()
    }
}
