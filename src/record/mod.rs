//! # Records
//!
//! A record is the unit of storage: a value that writes itself to a
//! [`DataOutput`] and reads itself back from a [`DataInput`], independent of the
//! file layout around it. Containers never look inside a record.
//!
//! Fixed-size containers additionally need [`FixedSizeRecord`], which lets the
//! reader discover the encoded width from the first decoded record.

mod aligned;

use std::sync::Arc;

use crate::io::{DataInput, DataOutput};
use crate::Result;

pub use aligned::{AlignedRead, ReferenceContext};

/// A value that can encode itself into, and decode itself from, a byte stream
pub trait Record {
    /// Stable name written to self-describing footers to identify the record type
    const TAG: &'static str;

    /// Writes this record at the current position of `out`
    fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()>;

    /// Replaces the contents of this record with the record at the current position of `input`
    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()>;
}

/// A record whose encoded width is the same for every instance in a container
pub trait FixedSizeRecord: Record {
    /// Returns the encoded width in bytes.
    ///
    /// May be `None` until the record has been populated once.
    fn fixed_size(&self) -> Option<usize>;
}

/// A zero-argument constructor for empty record prototypes
pub type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Returns a factory building prototypes through [`Default`]
#[must_use]
pub fn default_factory<T: Default + 'static>() -> Factory<T> {
    Arc::new(T::default)
}

impl Record for i32 {
    const TAG: &'static str = "i32";
    fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_int(*self)
    }
    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        *self = input.get_int()?;
        Ok(())
    }
}
impl FixedSizeRecord for i32 {
    fn fixed_size(&self) -> Option<usize> {
        Some(4)
    }
}

impl Record for i64 {
    const TAG: &'static str = "i64";
    fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_long(*self)
    }
    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        *self = input.get_long()?;
        Ok(())
    }
}
impl FixedSizeRecord for i64 {
    fn fixed_size(&self) -> Option<usize> {
        Some(8)
    }
}

/// Length-prefixed UTF-8 string
impl Record for String {
    const TAG: &'static str = "string";
    fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_string(self)
    }
    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        *self = input.get_string()?;
        Ok(())
    }
}

/// Length-prefixed opaque bytes
impl Record for Vec<u8> {
    const TAG: &'static str = "bytes";
    fn serialize<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_cint(crate::io::cint_len(self.len())?)?;
        out.put_bytes(self)
    }
    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        let len = input.get_cint()? as usize;
        *self = input.get_vec(len)?;
        Ok(())
    }
}
