//! # Disk-resident indexed arrays
//!
//! [`DiskArray`] is the read-side contract shared by the fixed-size and
//! variable-size containers. An implementation only needs to map an index to a
//! byte offset in its data region; decoding, cursors, and eager loading are
//! provided on top of that.
//!
//! Decoding is lazy: nothing is read until a record is requested, and every
//! request seeks a fresh cursor over the memory-mapped data region, so any
//! number of cursors may run concurrently over one open array.

use std::mem::size_of;

use crate::error::{ReadError, Result};
use crate::io::{FileView, Positioned};
use crate::serializer::RecordSerializer;

/// Random and sequential read access to an on-disk sequence of records
pub trait DiskArray {
    /// The record type
    type Item;

    /// The strategy records were written with
    type Serializer: RecordSerializer<Self::Item> + Clone;

    /// Number of addressable elements
    fn len(&self) -> usize;

    /// Byte offset of element `index`, relative to [`data`](Self::data)
    fn index_to_offset(&self, index: usize) -> Result<u64>;

    /// The region holding the encoded records
    fn data(&self) -> &FileView;

    /// The serializer restored when the array was opened
    fn serializer(&self) -> &Self::Serializer;

    /// A fresh, empty record to decode into
    fn prototype(&self) -> Self::Item;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails with [`ReadError::OutOfRange`] unless `index < len()`
    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(ReadError::OutOfRange(index, self.len()).into());
        }
        Ok(())
    }

    /// Decodes element `index` into `record` using the given serializer
    ///
    /// This is the primitive every other accessor is built on; cursors call it
    /// with their own serializer so scratch state is never shared.
    fn decode_into(
        &self,
        serializer: &mut Self::Serializer,
        record: &mut Self::Item,
        index: usize,
    ) -> Result<()> {
        self.check_index(index)?;
        let offset = self.index_to_offset(index)?;
        let mut cursor = self.data().cursor();
        cursor.seek_to(offset)?;
        serializer.deserialize(&mut cursor, record)
    }

    /// Decodes element `index` into an existing record
    fn get_into(&self, record: &mut Self::Item, index: usize) -> Result<()> {
        let mut serializer = self.serializer().clone();
        self.decode_into(&mut serializer, record, index)
    }

    /// Decodes element `index` into a new record
    fn get(&self, index: usize) -> Result<Self::Item> {
        let mut record = self.prototype();
        self.get_into(&mut record, index)?;
        Ok(record)
    }

    /// Returns a lazy cursor over every element, in index order
    fn cursor(&self) -> ArrayCursor<'_, Self>
    where
        Self: Sized,
    {
        ArrayCursor::new(self)
    }

    /// Decodes every element into memory
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::CapacityExceeded`] before allocating if the
    /// elements cannot be held in a single in-memory vector.
    fn load(&self) -> Result<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let len = self.len();
        let limit = max_load_len::<Self::Item>();
        if len > limit {
            return Err(ReadError::CapacityExceeded(len, limit).into());
        }

        let mut records = Vec::new();
        records
            .try_reserve_exact(len)
            .map_err(|_| ReadError::CapacityExceeded(len, limit))?;
        for record in self.cursor() {
            records.push(record?);
        }
        Ok(records)
    }
}

/// Largest number of `T` a single vector can address
fn max_load_len<T>() -> usize {
    isize::MAX as usize / size_of::<T>().max(1)
}

/// A lazy, finite cursor over the elements of a [`DiskArray`]
///
/// The cursor owns a clone of the array's serializer, so independent cursors
/// never share scratch buffers.
pub struct ArrayCursor<'a, A: DiskArray> {
    array: &'a A,
    serializer: A::Serializer,
    index: usize,
}
impl<'a, A: DiskArray> ArrayCursor<'a, A> {
    pub fn new(array: &'a A) -> Self {
        Self {
            array,
            serializer: array.serializer().clone(),
            index: 0,
        }
    }

    /// Index of the next element to be decoded
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Decodes the next element into `record`, reusing its allocations
    ///
    /// Returns `false` once every element has been read.
    pub fn next_into(&mut self, record: &mut A::Item) -> Result<bool> {
        if self.index >= self.array.len() {
            return Ok(false);
        }
        self.array
            .decode_into(&mut self.serializer, record, self.index)?;
        self.index += 1;
        Ok(true)
    }
}

impl<A: DiskArray> Iterator for ArrayCursor<'_, A> {
    type Item = Result<A::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = self.array.prototype();
        match self.next_into(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(e) => {
                // a failed element is not retried
                self.index += 1;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::DirectSerializer;
    use crate::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Claims more `i64` elements than any vector can hold
    struct Oversized {
        data: FileView,
        serializer: DirectSerializer<i64>,
    }
    impl DiskArray for Oversized {
        type Item = i64;
        type Serializer = DirectSerializer<i64>;

        fn len(&self) -> usize {
            usize::MAX
        }
        fn index_to_offset(&self, _index: usize) -> Result<u64> {
            Ok(0)
        }
        fn data(&self) -> &FileView {
            &self.data
        }
        fn serializer(&self) -> &Self::Serializer {
            &self.serializer
        }
        fn prototype(&self) -> i64 {
            0
        }
    }

    #[test]
    fn test_load_limit_scales_with_item_size() {
        assert_eq!(max_load_len::<u8>(), isize::MAX as usize);
        assert_eq!(max_load_len::<u64>(), isize::MAX as usize / 8);
        assert_eq!(max_load_len::<()>(), isize::MAX as usize);
    }

    #[test]
    fn test_load_refuses_oversized_array() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&7i64.to_be_bytes())?;
        file.flush()?;
        let array = Oversized {
            data: FileView::open(file.path())?,
            serializer: DirectSerializer::new(),
        };

        // a single element still decodes
        assert_eq!(array.get(0)?, 7);

        let limit = isize::MAX as usize / 8;
        assert!(matches!(
            array.load(),
            Err(Error::ReadError(ReadError::CapacityExceeded(len, max)))
                if len == usize::MAX && max == limit
        ));
        Ok(())
    }
}
