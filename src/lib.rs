//! # diskrec
//!
//! Disk-resident record containers: append records once, then read them back by
//! index straight from a memory-mapped file, without loading the file.
//!
//! Three layouts are provided:
//!
//! - [`fixed`]: records of one encoded width, concatenated with no index.
//! - [`var`]: records of any width behind an offset table, optionally grouped
//!   several to a slot.
//! - [`sorted`]: a sorted array of `i32` values with binary search.
//!
//! How a record becomes bytes is decided by a [`RecordSerializer`], independent
//! of the layout. [`DirectSerializer`] uses the record's own [`Record`]
//! implementation, [`SchemaSerializer`] encodes through an explicit [`Schema`]
//! with optional zstd compression, and [`ContextSerializer`] stores only the
//! per-record payload of records bound to a context known at open time (see
//! [`AlignedRead`]). Serializers that carry configuration write it to a
//! self-describing footer, so a container can be inspected with
//! [`fixed::describe`] or [`var::describe`] without knowing its record type.
//!
//! Every layout reads through the [`DiskArray`] trait, which provides random
//! access, lazy cursors, eager loading and (through [`ParallelReader`])
//! multi-threaded processing.

pub mod array;
pub mod error;
pub mod fixed;
pub mod io;
pub mod parallel;
pub mod record;
pub mod serializer;
pub mod sorted;
pub mod var;

pub use array::{ArrayCursor, DiskArray};
pub use error::{Error, FooterError, ReadError, Result, SchemaError, WriteError};
pub use io::{DataInput, DataOutput, FileView, Positioned};
pub use parallel::{ParallelProcessor, ParallelReader};
pub use record::{default_factory, AlignedRead, Factory, FixedSizeRecord, Record, ReferenceContext};
pub use serializer::{
    ContextRecord, ContextSerializer, Descriptor, DirectSerializer, RecordSerializer, Schema,
    SchemaSerializer, SerializerKind, ZstdCompressor,
};

#[cfg(test)]
mod testing {

    use super::*;
    use crate::var::{VarDiskArray, VarWriter};
    use parking_lot::Mutex;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn random_sequence(rng: &mut SmallRng, len: usize) -> Vec<u8> {
        (0..len).map(|_| b"ACGT"[rng.random_range(0..4)]).collect()
    }

    #[test]
    fn test_aligned_reads_by_context() -> Result<()> {
        let context = ReferenceContext::with_metadata("chr17", json!({"sample": "HG002"}));
        let mut rng = SmallRng::seed_from_u64(42);

        let mut sequences = Vec::new();
        let file = NamedTempFile::new()?;
        let mut writer = VarWriter::create(
            file.path(),
            ContextSerializer::<AlignedRead>::new(context.clone()),
        )?;
        for position in 0..200u32 {
            let len = rng.random_range(1..300);
            let sequence = random_sequence(&mut rng, len);
            writer.push(&AlignedRead::new(
                context.clone(),
                position * 7,
                u64::from(position % 4),
                &sequence,
            )?)?;
            sequences.push(sequence);
        }
        writer.finish()?;

        let array = VarDiskArray::<AlignedRead, _>::open_default(
            file.path(),
            ContextSerializer::new(context),
        )?;
        assert_eq!(array.len(), 200);

        let mut dbuf = Vec::new();
        for (i, read) in array.cursor().enumerate() {
            let read = read?;
            assert_eq!(read.reference(), "chr17");
            assert_eq!(read.position(), i as u32 * 7);
            assert_eq!(read.slen(), sequences[i].len());

            dbuf.clear();
            read.decode_s(&mut dbuf)?;
            assert_eq!(dbuf, sequences[i]);
        }
        Ok(())
    }

    #[derive(Clone)]
    struct ReadLengths {
        lengths: Arc<Mutex<Vec<(usize, usize)>>>,
    }
    impl ParallelProcessor<AlignedRead> for ReadLengths {
        fn process_record(&mut self, index: usize, record: &AlignedRead) -> Result<()> {
            self.lengths.lock().push((index, record.slen()));
            Ok(())
        }
    }

    #[test]
    fn test_parallel_over_context_records() -> Result<()> {
        let context = ReferenceContext::new("chrY");
        let file = NamedTempFile::new()?;
        let mut writer = VarWriter::create(
            file.path(),
            ContextSerializer::<AlignedRead>::new(context.clone()),
        )?;
        for len in 1..=64usize {
            writer.push(&AlignedRead::new(context.clone(), 0, 0, &b"G".repeat(len))?)?;
        }
        writer.finish()?;

        let array = VarDiskArray::<AlignedRead, _>::open_default(
            file.path(),
            ContextSerializer::new(context),
        )?;
        let processor = ReadLengths {
            lengths: Arc::new(Mutex::new(Vec::new())),
        };
        array.process_parallel(processor.clone(), 0)?;

        let mut lengths = processor.lengths.lock().clone();
        lengths.sort_unstable();
        let expected: Vec<(usize, usize)> = (0..64).map(|i| (i, i + 1)).collect();
        assert_eq!(lengths, expected);
        Ok(())
    }

    #[test]
    fn test_describe_without_record_type() -> Result<()> {
        let schema = Schema::<(String, i32)>::new("named-count")
            .string_field("name", |r| r.0.as_str(), |r, v| r.0 = v)
            .int_field("count", |r| r.1, |r, v| r.1 = v);
        let file = NamedTempFile::new()?;
        let mut writer = VarWriter::create(
            file.path(),
            SchemaSerializer::new(schema).compressor(Arc::new(ZstdCompressor::default())),
        )?;
        writer.push(&("alpha".to_string(), 1))?;
        writer.finish()?;

        let descriptor = var::describe(file.path())?;
        assert_eq!(descriptor.kind, SerializerKind::Schema);
        assert_eq!(descriptor.tag, "named-count");
        assert!(descriptor.compressed);
        assert_eq!(descriptor.metadata, None);
        Ok(())
    }
}
