use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};
use tempfile::NamedTempFile;
use tracing::debug;

use super::SIZE_ENTRY;
use crate::error::Result;
use crate::io::{DataOutput, OutputStream, Positioned, DEFAULT_BUFFER_CAPACITY};
use crate::serializer::{DirectSerializer, RecordSerializer};

/// Builder for [`VarWriter`] instances
///
/// ```no_run
/// # use diskrec::{DirectSerializer, Result};
/// # use diskrec::var::VarWriterBuilder;
/// # fn main() -> Result<()> {
/// let mut writer = VarWriterBuilder::default()
///     .temp_dir("/scratch")
///     .buffer_capacity(1 << 20)
///     .create("reads.drv", DirectSerializer::<String>::new())?;
/// writer.push(&"ACGT".to_string())?;
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct VarWriterBuilder {
    /// Directory for the temporary index and data files
    temp_dir: Option<PathBuf>,
    /// Write buffer capacity for each stream
    buffer_capacity: Option<usize>,
}
impl VarWriterBuilder {
    /// Sets the directory the temporary files are created in
    ///
    /// Defaults to the destination's directory for [`create`](Self::create),
    /// and to the system temporary directory for [`build`](Self::build).
    #[must_use]
    pub fn temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the write buffer capacity of each stream
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    /// Builds a writer that finishes into `inner`
    pub fn build<W, T, S>(self, inner: W, serializer: S) -> Result<VarWriter<W, T, S>>
    where
        W: Write + Seek,
        S: RecordSerializer<T>,
    {
        let capacity = self.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
        let (index, data) = match &self.temp_dir {
            Some(dir) => (NamedTempFile::new_in(dir)?, NamedTempFile::new_in(dir)?),
            None => (NamedTempFile::new()?, NamedTempFile::new()?),
        };
        VarWriter::from_parts(inner, index, data, serializer, capacity)
    }

    /// Creates (or truncates) the file at `path` and builds a writer that finishes into it
    pub fn create<P, T, S>(mut self, path: P, serializer: S) -> Result<VarWriter<File, T, S>>
    where
        P: AsRef<Path>,
        S: RecordSerializer<T>,
    {
        let path = path.as_ref();
        if self.temp_dir.is_none() {
            self.temp_dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf);
        }
        let inner = File::create(path)?;
        self.build(inner, serializer)
    }
}

/// Writes a variable-size container in two phases
///
/// While streaming, every slot appends the current data position to a
/// temporary index file and its records to a temporary data file. On
/// [`finish`](Self::finish) the destination receives the table length, the
/// index with every entry shifted by that length, and the data verbatim. The
/// temporaries are deleted when the writer is finished or dropped.
pub struct VarWriter<W: Write + Seek, T, S = DirectSerializer<T>> {
    /// Destination of the finished container
    inner: W,

    /// Temporary offset table
    index: OutputStream<NamedTempFile>,

    /// Temporary record data
    data: OutputStream<NamedTempFile>,

    /// Strategy used to encode every record
    serializer: S,

    /// Write buffer capacity used for the destination
    buffer_capacity: usize,

    /// Number of index entries written
    num_slots: usize,

    /// Number of records written across all slots
    num_records: usize,

    _marker: PhantomData<fn(&T)>,
}
impl<T, S: RecordSerializer<T>> VarWriter<File, T, S> {
    /// Creates a container at `path` with temporaries next to it
    pub fn create<P: AsRef<Path>>(path: P, serializer: S) -> Result<Self> {
        VarWriterBuilder::default().create(path, serializer)
    }
}
impl<W, T, S> VarWriter<W, T, S>
where
    W: Write + Seek,
    S: RecordSerializer<T>,
{
    /// Builds a writer with default settings that finishes into `inner`
    pub fn new(inner: W, serializer: S) -> Result<Self> {
        VarWriterBuilder::default().build(inner, serializer)
    }

    fn from_parts(
        inner: W,
        index: NamedTempFile,
        data: NamedTempFile,
        mut serializer: S,
        buffer_capacity: usize,
    ) -> Result<Self> {
        let index = OutputStream::with_capacity(buffer_capacity, index)?;
        let mut data = OutputStream::with_capacity(buffer_capacity, data)?;
        serializer.begin_serialize(&mut data)?;
        Ok(Self {
            inner,
            index,
            data,
            serializer,
            buffer_capacity,
            num_slots: 0,
            num_records: 0,
            _marker: PhantomData,
        })
    }

    /// Records the current data position as the next slot
    fn open_slot(&mut self) -> Result<()> {
        let position = self.data.tell()?;
        self.index.put_long(position as i64)?;
        self.num_slots += 1;
        Ok(())
    }

    /// Appends one record in its own slot
    pub fn push(&mut self, record: &T) -> Result<()> {
        self.open_slot()?;
        self.serializer.serialize(&mut self.data, record)?;
        self.num_records += 1;
        Ok(())
    }

    /// Appends every record of `records` under a single slot
    ///
    /// An empty group still occupies a slot.
    ///
    /// # Returns
    ///
    /// The number of records written.
    pub fn push_group<'a, I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.open_slot()?;
        let mut n = 0;
        for record in records {
            self.serializer.serialize(&mut self.data, record)?;
            n += 1;
        }
        self.num_records += n;
        Ok(n)
    }

    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    #[must_use]
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Assembles the container into the destination and returns it
    ///
    /// The temporaries are deleted on return, whether or not assembly succeeded.
    pub fn finish(mut self) -> Result<W> {
        self.serializer.end_serialize(&mut self.data)?;
        let table_len = self.num_slots as u64 * SIZE_ENTRY;

        let mut out = OutputStream::with_capacity(self.buffer_capacity, self.inner)?;
        out.put_long(table_len as i64)?;

        // shift every entry from data-relative to header-relative
        let mut index = self.index.into_inner()?;
        index.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&mut index);
        for _ in 0..self.num_slots {
            let entry = reader.read_i64::<BigEndian>()?;
            out.put_long(entry + table_len as i64)?;
        }

        let mut data = self.data.into_inner()?;
        data.seek(SeekFrom::Start(0))?;
        let data_bytes = io::copy(&mut data, &mut out)?;
        out.flush()?;

        debug!(
            slots = self.num_slots,
            records = self.num_records,
            table_len,
            data_bytes,
            "finished variable-size container"
        );
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_layout_of_finished_container() -> Result<()> {
        let mut writer = VarWriter::new(Cursor::new(Vec::new()), DirectSerializer::new())?;
        writer.push(&"A".to_string())?;
        writer.push(&"BB".to_string())?;
        writer.push(&"CCC".to_string())?;
        assert_eq!(writer.num_slots(), 3);

        let bytes = writer.finish()?.into_inner();
        let longs: Vec<i64> = bytes[..32]
            .chunks_exact(8)
            .map(|chunk| i64::from_be_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(longs, vec![24, 24, 26, 29]);
        assert_eq!(&bytes[32..], &[1, b'A', 2, b'B', b'B', 3, b'C', b'C', b'C']);
        Ok(())
    }

    #[test]
    fn test_offsets_shift_exactly_once() -> Result<()> {
        let mut writer = VarWriter::new(Cursor::new(Vec::new()), DirectSerializer::self_describing())?;
        writer.push_group(&[10i32, 11])?;
        writer.push(&12i32)?;

        let bytes = writer.finish()?.into_inner();
        // the placeholder occupies the first 8 bytes of the data region
        assert_eq!(&bytes[..8], &16i64.to_be_bytes());
        assert_eq!(&bytes[8..16], &(16i64 + 8).to_be_bytes());
        assert_eq!(&bytes[16..24], &(16i64 + 8 + 8).to_be_bytes());
        Ok(())
    }

    #[test]
    fn test_empty_container() -> Result<()> {
        let writer = VarWriter::<_, String>::new(Cursor::new(Vec::new()), DirectSerializer::new())?;
        let bytes = writer.finish()?.into_inner();
        assert_eq!(bytes, 0i64.to_be_bytes().to_vec());
        Ok(())
    }
}
