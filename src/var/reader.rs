use std::path::Path;

use tracing::debug;

use super::{read_table_len, SIZE_ENTRY, SIZE_HEADER};
use crate::array::DiskArray;
use crate::error::{ReadError, Result};
use crate::io::{FileView, Positioned};
use crate::record::{default_factory, Factory};
use crate::serializer::{DirectSerializer, RecordSerializer};

/// A memory-mapped variable-size container
///
/// Element `i` is the first record of slot `i`;
/// [`get_collection`](Self::get_collection) returns every record of a slot.
/// A slot written with no records has no element, and decoding it fails with
/// [`ReadError::EmptySlot`].
pub struct VarDiskArray<T, S = DirectSerializer<T>> {
    /// The offset table, `[8, 8 + L)` of the file
    index: FileView,

    /// The data region, from `8 + L` up to the footer (if any)
    data: FileView,

    /// Byte length of the offset table (`L`)
    table_len: u64,

    /// Position of the first record in the data region
    first_record: u64,

    /// Serializer restored from the stream when it was opened
    serializer: S,

    /// Builds empty records to decode into
    factory: Factory<T>,
}
impl<T, S> VarDiskArray<T, S>
where
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
    /// # Errors
    ///
    /// * [`ReadError::InvalidTableLength`] if `L` is negative or not a multiple of 8
    /// * [`ReadError::FileTruncation`] if the view is shorter than the table
    pub fn from_view(view: FileView, mut serializer: S, factory: Factory<T>) -> Result<Self> {
        let table_len = read_table_len(&view)?;
        let index = view.subview(SIZE_HEADER, SIZE_HEADER + table_len)?;
        let region = view.tail(SIZE_HEADER + table_len)?;

        let mut cursor = region.cursor();
        let data_end = serializer.begin_deserialize(&mut cursor)?;
        let first_record = cursor.tell()?;
        let data = region.subview(0, data_end.unwrap_or(region.size()))?;

        debug!(
            slots = table_len / SIZE_ENTRY,
            data_bytes = data.size(),
            "opened variable-size container"
        );
        Ok(Self {
            index,
            data,
            table_len,
            first_record,
            serializer,
            factory,
        })
    }

    /// Byte length of the offset table
    #[must_use]
    pub fn table_len(&self) -> u64 {
        self.table_len
    }

    /// Reads the raw table entry for slot `index`
    ///
    /// The entry is relative to byte 8 of the file.
    pub fn entry(&self, index: usize) -> Result<u64> {
        self.check_index(index)?;
        let raw = self.index.get_long(index as u64 * SIZE_ENTRY)?;
        u64::try_from(raw).map_err(|_| {
            ReadError::CorruptOffsets {
                index,
                start: raw as u64,
                end: raw as u64,
                len: self.data.size(),
            }
            .into()
        })
    }

    /// Byte range `[start, end)` of slot `index` in the data region
    ///
    /// The last slot runs to the end of the data region.
    pub fn slot_range(&self, index: usize) -> Result<(u64, u64)> {
        let start = self.index_to_offset(index)?;
        let end = if index + 1 < self.len() {
            self.index_to_offset(index + 1)?
        } else {
            self.data.size()
        };
        if end < start {
            return Err(ReadError::CorruptOffsets {
                index,
                start,
                end,
                len: self.data.size(),
            }
            .into());
        }
        Ok((start, end))
    }

    /// Decodes every record of slot `index`, appending them to `out`
    ///
    /// # Returns
    ///
    /// The number of records appended.
    pub fn get_collection(&self, index: usize, out: &mut Vec<T>) -> Result<usize> {
        let (start, end) = self.slot_range(index)?;
        let mut serializer = self.serializer.clone();
        let mut cursor = self.data.cursor();
        cursor.seek_to(start)?;

        let mut n = 0;
        while cursor.tell()? < end {
            let mut record = (self.factory)();
            serializer.deserialize(&mut cursor, &mut record)?;
            out.push(record);
            n += 1;
        }

        // the last record must end exactly on the slot boundary
        let consumed = cursor.tell()?;
        if consumed != end {
            return Err(ReadError::CorruptOffsets {
                index,
                start,
                end: consumed,
                len: end,
            }
            .into());
        }
        Ok(n)
    }
}

impl<T, S> DiskArray for VarDiskArray<T, S>
where
    S: RecordSerializer<T> + Clone,
{
    type Item = T;
    type Serializer = S;

    fn len(&self) -> usize {
        (self.table_len / SIZE_ENTRY) as usize
    }

    fn index_to_offset(&self, index: usize) -> Result<u64> {
        let entry = self.entry(index)?;
        match entry.checked_sub(self.table_len) {
            Some(offset) if offset >= self.first_record && offset <= self.data.size() => Ok(offset),
            _ => Err(ReadError::CorruptOffsets {
                index,
                start: entry,
                end: entry,
                len: self.data.size(),
            }
            .into()),
        }
    }

    /// Decodes the first record of slot `index`
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::EmptySlot`] if the slot was written with no records.
    fn decode_into(&self, serializer: &mut S, record: &mut T, index: usize) -> Result<()> {
        let (start, end) = self.slot_range(index)?;
        if start == end {
            return Err(ReadError::EmptySlot(index).into());
        }
        let mut cursor = self.data.cursor();
        cursor.seek_to(start)?;
        serializer.deserialize(&mut cursor, record)
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
    use crate::io::DataOutput;
    use crate::serializer::{Schema, SchemaSerializer, ZstdCompressor};
    use crate::var::{VarWriter, VarWriterBuilder};
    use crate::Error;
    use serde_json::json;
    use std::io::{Cursor, Write};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn write_strings(serializer: DirectSerializer<String>, values: &[String]) -> Result<NamedTempFile> {
        let file = NamedTempFile::new()?;
        let mut writer = VarWriter::create(file.path(), serializer)?;
        for value in values {
            writer.push(value)?;
        }
        writer.finish()?;
        Ok(file)
    }

    #[test]
    fn test_three_strings() -> Result<()> {
        let values = strings(&["A", "BB", "CCC"]);
        let file = write_strings(DirectSerializer::new(), &values)?;
        let array = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::new())?;

        assert_eq!(array.table_len(), 24);
        assert_eq!(array.len(), 3);
        assert_eq!(array.entry(0)?, 24);
        assert_eq!(array.entry(1)?, 24 + 2);
        assert_eq!(array.entry(2)?, 24 + 2 + 3);
        assert_eq!(array.index_to_offset(2)?, 5);
        assert_eq!(array.get(2)?, "CCC");
        assert_eq!(array.get(0)?, "A");
        assert_eq!(array.load()?, values);
        Ok(())
    }

    #[test]
    fn test_offsets_are_monotonic() -> Result<()> {
        let values: Vec<String> = (0..500).map(|i| "N".repeat(i % 37)).collect();
        let file = write_strings(DirectSerializer::new(), &values)?;
        let array = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::new())?;

        let mut prev = array.entry(0)?;
        assert_eq!(prev, array.table_len());
        for i in 1..array.len() {
            let entry = array.entry(i)?;
            assert!(entry >= prev);
            prev = entry;
        }
        for (i, record) in array.cursor().enumerate() {
            assert_eq!(record?, values[i]);
        }
        Ok(())
    }

    #[test]
    fn test_grouped_slots() -> Result<()> {
        let file = NamedTempFile::new()?;
        let mut writer = VarWriter::create(file.path(), DirectSerializer::new())?;
        writer.push_group(&[1i64, 2, 3])?;
        writer.push(&4i64)?;
        writer.push_group(&[])?;
        writer.push_group(&[5i64, 6])?;
        assert_eq!(writer.num_slots(), 4);
        assert_eq!(writer.num_records(), 6);
        writer.finish()?;

        let array = VarDiskArray::<i64>::open_default(file.path(), DirectSerializer::new())?;
        assert_eq!(array.len(), 4);

        let mut out = Vec::new();
        assert_eq!(array.get_collection(0, &mut out)?, 3);
        assert_eq!(array.get_collection(1, &mut out)?, 1);
        assert_eq!(array.get_collection(2, &mut out)?, 0);
        assert_eq!(array.get_collection(3, &mut out)?, 2);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);

        // get returns the first record of a slot
        assert_eq!(array.get(3)?, 5);
        Ok(())
    }

    #[test]
    fn test_empty_slot_has_no_element() -> Result<()> {
        let file = NamedTempFile::new()?;
        let mut writer = VarWriter::create(file.path(), DirectSerializer::new())?;
        writer.push(&1i64)?;
        writer.push_group(&[])?;
        writer.push(&9i64)?;
        writer.push_group(&[])?;
        writer.finish()?;

        let array = VarDiskArray::<i64>::open_default(file.path(), DirectSerializer::new())?;
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(0)?, 1);
        assert_eq!(array.get(2)?, 9);

        // an empty slot never borrows the next slot's record
        assert!(matches!(
            array.get(1),
            Err(Error::ReadError(ReadError::EmptySlot(1)))
        ));
        // and an empty last slot fails the same way instead of running off the data
        assert!(matches!(
            array.get(3),
            Err(Error::ReadError(ReadError::EmptySlot(3)))
        ));
        assert!(matches!(
            array.load(),
            Err(Error::ReadError(ReadError::EmptySlot(1)))
        ));

        let mut out = Vec::new();
        assert_eq!(array.get_collection(1, &mut out)?, 0);
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_footer_inside_data_region() -> Result<()> {
        let values = strings(&["chr1", "chr2", "chrX"]);
        let metadata = json!({"assembly": "T2T"});
        let file = write_strings(DirectSerializer::with_metadata(metadata.clone()), &values)?;

        let descriptor = crate::var::describe(file.path())?;
        assert_eq!(descriptor.tag, "string");
        assert_eq!(descriptor.metadata, Some(metadata));

        let array = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::self_describing())?;
        // the placeholder precedes the first record
        assert_eq!(array.entry(0)?, array.table_len() + 8);
        assert_eq!(array.load()?, values);

        // the last slot stops at the footer
        let mut out = Vec::new();
        assert_eq!(array.get_collection(2, &mut out)?, 1);
        Ok(())
    }

    #[test]
    fn test_compressed_schema_records() -> Result<()> {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Feature {
            name: String,
            score: f64,
        }
        let schema = Arc::new(
            Schema::<Feature>::new("feature")
                .string_field("name", |f| f.name.as_str(), |f, v| f.name = v)
                .double_field("score", |f| f.score, |f, v| f.score = v),
        );
        let features: Vec<Feature> = (0..64)
            .map(|i| Feature {
                name: format!("gene-{i}-").repeat(i % 5 + 1),
                score: i as f64 / 4.0,
            })
            .collect();

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("features.drv");
        let mut writer = VarWriterBuilder::default()
            .temp_dir(dir.path())
            .buffer_capacity(1024)
            .create(
                &path,
                SchemaSerializer::from_shared(schema.clone())
                    .compressor(Arc::new(ZstdCompressor::new(1))),
            )?;
        for feature in &features {
            writer.push(feature)?;
        }
        writer.finish()?;

        // only the container is left behind
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);

        let array = VarDiskArray::<Feature, _>::open_default(&path, SchemaSerializer::from_shared(schema))?;
        assert!(array.serializer().is_compressed());
        assert_eq!(array.get(63)?, features[63]);
        assert_eq!(array.load()?, features);
        Ok(())
    }

    #[test]
    fn test_invalid_table_length() -> Result<()> {
        let mut bytes = Cursor::new(Vec::new());
        bytes.put_long(12)?;
        bytes.put_bytes(&[0; 16])?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes.into_inner())?;
        file.flush()?;

        let result = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::new());
        assert!(matches!(
            result,
            Err(Error::ReadError(ReadError::InvalidTableLength(12)))
        ));
        Ok(())
    }

    #[test]
    fn test_truncated_table() -> Result<()> {
        let mut bytes = Cursor::new(Vec::new());
        bytes.put_long(64)?;
        bytes.put_long(64)?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes.into_inner())?;
        file.flush()?;

        let result = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::new());
        assert!(matches!(
            result,
            Err(Error::ReadError(ReadError::FileTruncation { expected: 72, found: 16 }))
        ));
        Ok(())
    }

    #[test]
    fn test_descending_offsets_are_rejected() -> Result<()> {
        // two slots whose entries run backwards: "BB" at 18, then "A" at 16
        let mut bytes = Cursor::new(Vec::new());
        bytes.put_long(16)?;
        bytes.put_long(16 + 2)?;
        bytes.put_long(16)?;
        bytes.put_string("A")?;
        bytes.put_string("BB")?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes.into_inner())?;
        file.flush()?;

        let array = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::new())?;
        let mut out = Vec::new();
        assert!(matches!(
            array.get_collection(0, &mut out),
            Err(Error::ReadError(ReadError::CorruptOffsets {
                index: 0,
                start: 2,
                end: 0,
                ..
            }))
        ));
        assert!(matches!(
            array.get(0),
            Err(Error::ReadError(ReadError::CorruptOffsets { index: 0, .. }))
        ));
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_corrupt_offset_is_rejected() -> Result<()> {
        // one slot pointing before the data region
        let mut bytes = Cursor::new(Vec::new());
        bytes.put_long(8)?;
        bytes.put_long(3)?;
        bytes.put_string("A")?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes.into_inner())?;
        file.flush()?;

        let array = VarDiskArray::<String>::open_default(file.path(), DirectSerializer::new())?;
        assert!(matches!(
            array.get(0),
            Err(Error::ReadError(ReadError::CorruptOffsets { index: 0, .. }))
        ));
        Ok(())
    }
}
