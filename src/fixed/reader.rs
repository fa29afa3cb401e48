use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::array::DiskArray;
use crate::error::{ReadError, Result};
use crate::io::{FileView, Positioned};
use crate::record::{default_factory, Factory, FixedSizeRecord};
use crate::serializer::{DirectSerializer, RecordSerializer};

/// A memory-mapped fixed-size container
///
/// Element `i` is decoded from `i × record_size` in the data region. The
/// record size is discovered once, by decoding the first element, and cached.
pub struct FixedDiskArray<T, S = DirectSerializer<T>> {
    /// Record data, excluding any footer pointer and footer
    data: FileView,

    /// Serializer restored from the stream when it was opened
    serializer: S,

    /// Builds empty records to decode into
    factory: Factory<T>,

    /// Encoded width of one element, known after discovery
    record_size: OnceLock<usize>,
}
impl<T, S> FixedDiskArray<T, S>
where
    T: FixedSizeRecord,
    S: RecordSerializer<T> + Clone,
{
    /// Memory-maps the container at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - The container to open
    /// * `serializer` - The strategy the container was written with
    /// * `factory` - Builds the empty records elements are decoded into
    pub fn open<P: AsRef<Path>>(path: P, serializer: S, factory: Factory<T>) -> Result<Self> {
        Self::from_view(FileView::open(path)?, serializer, factory)
    }

    /// Memory-maps the container at `path`, building prototypes with [`Default`]
    pub fn open_default<P: AsRef<Path>>(path: P, serializer: S) -> Result<Self>
    where
        T: Default + 'static,
    {
        Self::open(path, serializer, default_factory())
    }

    /// Opens the container held by `view`
    ///
    /// Runs the serializer's `begin_deserialize`, bounds the data region by the
    /// footer (if any), and discovers the record size from the first element.
    pub fn from_view(view: FileView, mut serializer: S, factory: Factory<T>) -> Result<Self> {
        let mut cursor = view.cursor();
        let data_end = serializer.begin_deserialize(&mut cursor)?;
        let data_start = cursor.tell()?;
        let data = view.subview(data_start, data_end.unwrap_or(view.size()))?;

        let array = Self {
            data,
            serializer,
            factory,
            record_size: OnceLock::new(),
        };
        if !array.data.is_empty() {
            array.discover_record_size()?;
        }
        debug!(
            bytes = array.data.size(),
            records = array.len(),
            record_size = ?array.record_size(),
            "opened fixed-size container"
        );
        Ok(array)
    }

    /// The encoded width of one element, if it has been discovered
    #[must_use]
    pub fn record_size(&self) -> Option<usize> {
        self.record_size.get().copied()
    }

    /// Decodes the first element to learn the encoded record width
    ///
    /// Idempotent: after the first successful call the cached size is returned.
    ///
    /// # Errors
    ///
    /// * [`ReadError::NotFixedSize`] if the decoded record reports no fixed size
    /// * [`ReadError::FixedSizeMismatch`] if the record reports more bytes than were decoded.
    ///   A smaller report is accepted, since serializers may add framing around each record.
    /// * [`ReadError::PartialRecord`] if the data region is not a whole number of records
    pub fn discover_record_size(&self) -> Result<usize> {
        if let Some(&size) = self.record_size.get() {
            return Ok(size);
        }

        let mut serializer = self.serializer.clone();
        let mut record = (self.factory)();
        let mut cursor = self.data.cursor();
        serializer.deserialize(&mut cursor, &mut record)?;

        // the stride is what the serializer consumed, which may include framing
        let consumed = cursor.tell()?;
        let Some(reported) = record.fixed_size().filter(|_| consumed > 0) else {
            return Err(ReadError::NotFixedSize.into());
        };
        if reported as u64 > consumed {
            return Err(ReadError::FixedSizeMismatch { reported, consumed }.into());
        }
        let size = consumed as usize;
        if self.data.size() % consumed != 0 {
            return Err(ReadError::PartialRecord {
                bytes: self.data.size(),
                record_size: size,
            }
            .into());
        }
        Ok(*self.record_size.get_or_init(|| size))
    }
}

impl<T, S> DiskArray for FixedDiskArray<T, S>
where
    T: FixedSizeRecord,
    S: RecordSerializer<T> + Clone,
{
    type Item = T;
    type Serializer = S;

    fn len(&self) -> usize {
        match self.record_size() {
            Some(size) => self.data.size() as usize / size,
            None => 0,
        }
    }

    fn index_to_offset(&self, index: usize) -> Result<u64> {
        let size = self.record_size().ok_or(ReadError::RecordSizeUnknown)?;
        Ok(index as u64 * size as u64)
    }

    fn data(&self) -> &FileView {
        &self.data
    }

    fn serializer(&self) -> &S {
        &self.serializer
    }

    fn prototype(&self) -> T {
        (self.factory)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedWriter;
    use crate::io::{DataInput, DataOutput};
    use crate::record::Record;
    use crate::serializer::{Schema, SchemaSerializer, SerializerKind};
    use crate::Error;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Coverage {
        position: i32,
        depth: i64,
    }
    impl Record for Coverage {
        const TAG: &'static str = "coverage";
        fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
            out.put_int(self.position)?;
            out.put_long(self.depth)
        }
        fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
            self.position = input.get_int()?;
            self.depth = input.get_long()?;
            Ok(())
        }
    }
    impl FixedSizeRecord for Coverage {
        fn fixed_size(&self) -> Option<usize> {
            Some(12)
        }
    }

    fn coverage(n: i32) -> Vec<Coverage> {
        (0..n)
            .map(|i| Coverage {
                position: i * 10,
                depth: i64::from(i) * 3,
            })
            .collect()
    }

    fn write_container<S: RecordSerializer<Coverage>>(
        serializer: S,
        records: &[Coverage],
    ) -> Result<NamedTempFile> {
        let file = NamedTempFile::new()?;
        let mut writer = FixedWriter::create(file.path(), serializer)?;
        for record in records {
            writer.push(record)?;
        }
        writer.finish()?;
        Ok(file)
    }

    #[test]
    fn test_random_access() -> Result<()> {
        let records = coverage(100);
        let file = write_container(DirectSerializer::new(), &records)?;
        let array = FixedDiskArray::<Coverage>::open_default(file.path(), DirectSerializer::new())?;

        assert_eq!(array.record_size(), Some(12));
        assert_eq!(array.len(), 100);
        assert_eq!(array.index_to_offset(7)?, 84);
        assert_eq!(array.get(57)?, records[57]);
        assert_eq!(array.get(0)?, records[0]);

        let mut record = Coverage::default();
        array.get_into(&mut record, 99)?;
        assert_eq!(record, records[99]);

        assert!(matches!(
            array.get(100),
            Err(Error::ReadError(ReadError::OutOfRange(100, 100)))
        ));
        Ok(())
    }

    #[test]
    fn test_cursor_and_load() -> Result<()> {
        let records = coverage(2500);
        let file = write_container(DirectSerializer::new(), &records)?;
        let array = FixedDiskArray::<Coverage>::open_default(file.path(), DirectSerializer::new())?;

        let mut cursor = array.cursor();
        let mut record = Coverage::default();
        let mut seen = 0;
        while cursor.next_into(&mut record)? {
            assert_eq!(record, records[seen]);
            seen += 1;
        }
        assert_eq!(seen, records.len());

        assert_eq!(array.load()?, records);
        Ok(())
    }

    #[test]
    fn test_self_describing_container() -> Result<()> {
        let records = coverage(10);
        let metadata = json!({"contig": "chrM"});
        let file = write_container(DirectSerializer::with_metadata(metadata.clone()), &records)?;

        let descriptor = crate::fixed::describe(file.path())?;
        assert_eq!(descriptor.kind, SerializerKind::Direct);
        assert_eq!(descriptor.tag, "coverage");

        let array = FixedDiskArray::<Coverage>::open_default(
            file.path(),
            DirectSerializer::self_describing(),
        )?;
        // the footer is not mistaken for records
        assert_eq!(array.len(), 10);
        assert_eq!(array.serializer().metadata(), Some(&metadata));
        assert_eq!(array.load()?, records);
        Ok(())
    }

    #[test]
    fn test_schema_framed_records() -> Result<()> {
        let schema = Schema::<Coverage>::new("coverage")
            .int_field("position", |c| c.position, |c, v| c.position = v)
            .long_field("depth", |c| c.depth, |c, v| c.depth = v);
        let schema = Arc::new(schema);
        let records = coverage(30);
        let file = write_container(SchemaSerializer::from_shared(schema.clone()), &records)?;

        let array = FixedDiskArray::<Coverage, _>::open_default(
            file.path(),
            SchemaSerializer::from_shared(schema),
        )?;
        // one length byte frames every 12-byte record
        assert_eq!(array.record_size(), Some(13));
        assert_eq!(array.get(29)?, records[29]);
        Ok(())
    }

    #[test]
    fn test_empty_container() -> Result<()> {
        let file = write_container(DirectSerializer::new(), &[])?;
        let array = FixedDiskArray::<Coverage>::open_default(file.path(), DirectSerializer::new())?;
        assert!(array.is_empty());
        assert_eq!(array.record_size(), None);
        assert!(matches!(
            array.index_to_offset(0),
            Err(Error::ReadError(ReadError::RecordSizeUnknown))
        ));
        assert!(array.load()?.is_empty());
        Ok(())
    }

    /// Writes an `i32` but claims to be as wide as an `i64`
    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Overstated(i32);
    impl Record for Overstated {
        const TAG: &'static str = "overstated";
        fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
            out.put_int(self.0)
        }
        fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
            self.0 = input.get_int()?;
            Ok(())
        }
    }
    impl FixedSizeRecord for Overstated {
        fn fixed_size(&self) -> Option<usize> {
            Some(8)
        }
    }

    #[test]
    fn test_overstated_record_size() -> Result<()> {
        let file = NamedTempFile::new()?;
        let mut writer = FixedWriter::create(file.path(), DirectSerializer::new())?;
        for value in 0..4 {
            writer.push(&Overstated(value))?;
        }
        writer.finish()?;

        let result = FixedDiskArray::<Overstated>::open_default(file.path(), DirectSerializer::new());
        assert!(matches!(
            result,
            Err(Error::ReadError(ReadError::FixedSizeMismatch {
                reported: 8,
                consumed: 4
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_partial_trailing_record() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&[0u8; 12 * 3 + 5])?;
        file.flush()?;
        let result = FixedDiskArray::<Coverage>::open_default(file.path(), DirectSerializer::new());
        assert!(matches!(
            result,
            Err(Error::ReadError(ReadError::PartialRecord {
                bytes: 41,
                record_size: 12
            }))
        ));
        Ok(())
    }
}
