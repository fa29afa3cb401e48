use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use super::footer::{self, Descriptor, SerializerKind};
use super::RecordSerializer;
use crate::error::{FooterError, Result};
use crate::io::{DataInput, DataOutput};
use crate::record::Record;

/// Serializes records through their own [`Record`] implementation
///
/// By default nothing but the records is written. A self-describing
/// serializer (see [`DirectSerializer::self_describing`]) additionally writes a
/// footer naming the record type and carrying an optional JSON metadata
/// document, and rejects streams of any other type on open.
pub struct DirectSerializer<T> {
    /// Shared metadata document, written to (or restored from) the footer
    metadata: Option<Arc<Value>>,

    /// Whether this serializer writes and expects a footer
    footer: bool,

    /// Position of the footer pointer placeholder in the stream being written
    placeholder: Option<u64>,

    _marker: PhantomData<fn() -> T>,
}
impl<T> DirectSerializer<T> {
    /// Creates a serializer that writes records only
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: None,
            footer: false,
            placeholder: None,
            _marker: PhantomData,
        }
    }

    /// Creates a serializer that writes and expects a type-checked footer
    #[must_use]
    pub fn self_describing() -> Self {
        Self {
            footer: true,
            ..Self::new()
        }
    }

    /// Creates a self-describing serializer carrying `metadata`
    #[must_use]
    pub fn with_metadata(metadata: Value) -> Self {
        Self {
            metadata: Some(Arc::new(metadata)),
            ..Self::self_describing()
        }
    }

    /// The metadata document, as written or as restored from an opened stream
    #[must_use]
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_deref()
    }

    #[must_use]
    pub fn is_self_describing(&self) -> bool {
        self.footer
    }
}

impl<T> Default for DirectSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DirectSerializer<T> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            footer: self.footer,
            placeholder: self.placeholder,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DirectSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSerializer")
            .field("metadata", &self.metadata)
            .field("footer", &self.footer)
            .finish_non_exhaustive()
    }
}

impl<T: Record> RecordSerializer<T> for DirectSerializer<T> {
    fn serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W, record: &T) -> Result<()> {
        record.serialize(out)
    }

    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R, record: &mut T) -> Result<()> {
        record.deserialize(input)
    }

    fn begin_serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        if self.footer {
            self.placeholder = Some(footer::write_placeholder(out)?);
        }
        Ok(())
    }

    fn end_serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        if !self.footer {
            return Ok(());
        }
        let placeholder = self
            .placeholder
            .take()
            .ok_or(FooterError::MissingPlaceholder)?;
        footer::write_footer(out, placeholder, |config| self.serialize_config(config))?;
        Ok(())
    }

    fn begin_deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<Option<u64>> {
        if !self.footer {
            return Ok(None);
        }
        let ((), data_end) = footer::read_footer(input, |config| self.deserialize_config(config))?;
        Ok(Some(data_end))
    }

    fn serialize_config<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        Descriptor::new(SerializerKind::Direct, T::TAG)
            .metadata(self.metadata.as_deref().cloned())
            .write_bytes(out)
    }

    fn deserialize_config<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        let descriptor = Descriptor::from_reader(input)?;
        descriptor.expect(SerializerKind::Direct, T::TAG)?;
        self.metadata = descriptor.metadata.map(Arc::new);
        Ok(())
    }
}
