use std::fs::File;
use std::io::{Seek, Write};
use std::marker::PhantomData;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, WriteError};
use crate::io::{OutputStream, Positioned};
use crate::serializer::{DirectSerializer, RecordSerializer};

/// Writes a fixed-size container
///
/// Records are encoded in call order with no index. The serializer's
/// `begin_serialize` runs when the writer is created and `end_serialize` runs
/// in [`finish`](Self::finish); a writer that is dropped without finishing
/// leaves a container that a self-describing reader will reject.
///
/// Every record must encode to the same number of bytes as the first one.
pub struct FixedWriter<W: Write + Seek, T, S = DirectSerializer<T>> {
    /// Buffered output
    inner: OutputStream<W>,

    /// Strategy used to encode every record
    serializer: S,

    /// Encoded width of the first record
    record_size: Option<u64>,

    /// Number of records written
    num_records: usize,

    _marker: PhantomData<fn(&T)>,
}
impl<T, S: RecordSerializer<T>> FixedWriter<File, T, S> {
    /// Creates (or truncates) the file at `path` and starts a container in it
    pub fn create<P: AsRef<Path>>(path: P, serializer: S) -> Result<Self> {
        Self::new(File::create(path)?, serializer)
    }
}
impl<W, T, S> FixedWriter<W, T, S>
where
    W: Write + Seek,
    S: RecordSerializer<T>,
{
    /// Starts a container at the current position of `inner`
    pub fn new(inner: W, serializer: S) -> Result<Self> {
        Self::from_stream(OutputStream::new(inner)?, serializer)
    }

    /// Starts a container using a write buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize, inner: W, serializer: S) -> Result<Self> {
        Self::from_stream(OutputStream::with_capacity(capacity, inner)?, serializer)
    }

    fn from_stream(mut inner: OutputStream<W>, mut serializer: S) -> Result<Self> {
        serializer.begin_serialize(&mut inner)?;
        Ok(Self {
            inner,
            serializer,
            record_size: None,
            num_records: 0,
            _marker: PhantomData,
        })
    }

    /// Appends one record
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::RecordSizeDrift`] if the record does not encode to
    /// the same width as the first record. The container is unusable afterwards.
    pub fn push(&mut self, record: &T) -> Result<()> {
        let start = self.inner.tell()?;
        self.serializer.serialize(&mut self.inner, record)?;
        let written = self.inner.tell()? - start;
        match self.record_size {
            None => self.record_size = Some(written),
            Some(expected) if expected != written => {
                return Err(WriteError::RecordSizeDrift {
                    expected,
                    got: written,
                }
                .into());
            }
            Some(_) => {}
        }
        self.num_records += 1;
        Ok(())
    }

    #[must_use]
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Encoded width of the records written so far
    #[must_use]
    pub fn record_size(&self) -> Option<u64> {
        self.record_size
    }

    /// Runs `end_serialize`, flushes, and returns the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.serializer.end_serialize(&mut self.inner)?;
        self.inner.flush()?;
        debug!(
            records = self.num_records,
            record_size = ?self.record_size,
            "finished fixed-size container"
        );
        self.inner.into_inner()
    }
}
