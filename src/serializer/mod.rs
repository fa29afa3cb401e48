//! # Record-set serializers
//!
//! A [`RecordSerializer`] decides how a stream of records of one type is turned
//! into bytes. Containers hand every record to their serializer and never
//! encode anything themselves, so the same fixed-size or variable-size layout
//! works with any of the strategies below:
//!
//! - [`DirectSerializer`] delegates to the record's own [`Record`](crate::Record)
//!   implementation, optionally carrying a shared JSON metadata document.
//! - [`SchemaSerializer`] encodes records through an explicit field [`Schema`],
//!   optionally compressing each record.
//! - [`ContextSerializer`] stores only the per-record payload of a
//!   [`ContextRecord`] and rebuilds each record from a context supplied at open time.
//!
//! ## Self-describing footer
//!
//! Serializers that need to carry configuration write it once per stream in a
//! footer (see [`footer`]). The stream then looks like:
//!
//! | Offset          | Size | Name    | Description                            |
//! | --------------- | ---- | ------- | -------------------------------------- |
//! | 0               | 8    | pointer | absolute position of the footer        |
//! | 8               | ...  | records | record data                            |
//! | pointer         | 4    | magic   | footer magic number ("DRFT")           |
//! | pointer + 4     | 8    | length  | length of the config block             |
//! | pointer + 12    | ...  | config  | [`Descriptor`] + strategy-specific data |
//!
//! The pointer is written as a placeholder before the first record and patched
//! once the footer has been written, so an unfinished stream is always
//! rejected on open.

mod compress;
mod context;
mod direct;
pub mod footer;
mod schema;

use auto_impl::auto_impl;

use crate::io::{DataInput, DataOutput};
use crate::Result;

pub use compress::{compressor_by_name, Compressor, ZstdCompressor, DEFAULT_COMPRESSION_LEVEL};
pub use context::{ContextRecord, ContextSerializer};
pub use direct::DirectSerializer;
pub use footer::{Descriptor, SerializerKind};
pub use schema::{FieldKind, FieldValue, Schema, SchemaDescriptor, SchemaSerializer, ScratchBuffer};

/// Strategy for encoding and decoding a stream of records of type `T`
///
/// Only [`serialize`](Self::serialize) and [`deserialize`](Self::deserialize)
/// are required; the stream-level hooks default to no-ops.
///
/// Serializers may hold per-instance scratch state, so one instance must not be
/// shared between threads. Readers clone their serializer for every cursor.
#[auto_impl(&mut, Box)]
pub trait RecordSerializer<T> {
    /// Encodes exactly one record at the current position of `out`
    fn serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W, record: &T) -> Result<()>;

    /// Decodes exactly one record from the current position of `input` into `record`
    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R, record: &mut T)
        -> Result<()>;

    /// Called once before the first record is written
    #[allow(unused_variables)]
    fn begin_serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        Ok(())
    }

    /// Called once after the last record is written
    #[allow(unused_variables)]
    fn end_serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        Ok(())
    }

    /// Called once before the first record is read
    ///
    /// Returns the position where record data stops when the stream carries a
    /// footer, or `None` when records run to the end of the stream. On return
    /// `input` is positioned at the first record.
    #[allow(unused_variables)]
    fn begin_deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<Option<u64>> {
        Ok(None)
    }

    /// Called once after the last record is read
    #[allow(unused_variables)]
    fn end_deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        Ok(())
    }

    /// Writes the configuration a reader needs to rebuild this serializer
    #[allow(unused_variables)]
    fn serialize_config<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        Ok(())
    }

    /// Restores the configuration written by [`serialize_config`](Self::serialize_config)
    #[allow(unused_variables)]
    fn deserialize_config<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        Ok(())
    }
}
