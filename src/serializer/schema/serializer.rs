use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{Schema, SchemaDescriptor, ScratchBuffer};
use crate::error::{FooterError, Result, SchemaError};
use crate::io::{cint_len, DataInput, DataOutput};
use crate::serializer::footer::{self, Descriptor, SerializerKind};
use crate::serializer::{compressor_by_name, Compressor, RecordSerializer};

/// Serializes records through an explicit [`Schema`], optionally compressing each one
///
/// Every record is framed as `cint length | bytes`, where the bytes are the
/// schema encoding (or its compressed form). The schema descriptor and the
/// compressor name travel in the footer; opening a stream whose stored schema
/// differs from the registered one fails with [`FooterError::TypeMismatch`].
///
/// Each instance owns two scratch buffers that are reused for every record.
/// Clones share the schema and compressor but get their own buffers.
pub struct SchemaSerializer<T> {
    /// Compiled field encoders and decoders
    schema: Arc<Schema<T>>,

    /// Optional per-record compression pass
    compressor: Option<Arc<dyn Compressor>>,

    /// Shared metadata document
    metadata: Option<Arc<Value>>,

    /// Position of the footer pointer placeholder in the stream being written
    placeholder: Option<u64>,

    /// Schema-encoded record bytes
    plain: ScratchBuffer,

    /// Compressed record bytes
    packed: ScratchBuffer,
}
impl<T: 'static> SchemaSerializer<T> {
    #[must_use]
    pub fn new(schema: Schema<T>) -> Self {
        Self::from_shared(Arc::new(schema))
    }

    /// Creates a serializer from a schema already shared with other serializers
    #[must_use]
    pub fn from_shared(schema: Arc<Schema<T>>) -> Self {
        Self {
            schema,
            compressor: None,
            metadata: None,
            placeholder: None,
            plain: ScratchBuffer::new(),
            packed: ScratchBuffer::new(),
        }
    }

    /// Compresses every record with `compressor`
    #[must_use]
    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Carries `metadata` in the footer
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    #[must_use]
    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    /// The metadata document, as written or as restored from an opened stream
    #[must_use]
    pub fn get_metadata(&self) -> Option<&Value> {
        self.metadata.as_deref()
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressor.is_some()
    }
}

impl<T> Clone for SchemaSerializer<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            compressor: self.compressor.clone(),
            metadata: self.metadata.clone(),
            placeholder: self.placeholder,
            plain: ScratchBuffer::new(),
            packed: ScratchBuffer::new(),
        }
    }
}

impl<T> fmt::Debug for SchemaSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSerializer")
            .field("schema", &self.schema)
            .field("compressor", &self.compressor)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> RecordSerializer<T> for SchemaSerializer<T> {
    fn serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W, record: &T) -> Result<()> {
        self.plain.clear();
        self.schema.encode(record, &mut self.plain)?;

        let bytes = match &self.compressor {
            Some(compressor) => {
                compressor.compress(self.plain.as_slice(), &mut self.packed)?;
                self.packed.as_slice()
            }
            None => self.plain.as_slice(),
        };
        out.put_cint(cint_len(bytes.len())?)?;
        out.put_bytes(bytes)
    }

    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R, record: &mut T) -> Result<()> {
        let len = input.get_cint()? as usize;
        match &self.compressor {
            Some(compressor) => {
                self.packed.fill_from(input, len)?;
                compressor.decompress(self.packed.as_slice(), &mut self.plain)?;
            }
            None => self.plain.fill_from(input, len)?,
        }

        self.schema.decode(record, &mut self.plain)?;
        if self.plain.position() != self.plain.len() {
            return Err(SchemaError::LengthMismatch {
                expected: self.plain.len(),
                found: self.plain.position(),
            }
            .into());
        }
        Ok(())
    }

    fn begin_serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        self.placeholder = Some(footer::write_placeholder(out)?);
        Ok(())
    }

    fn end_serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        let placeholder = self
            .placeholder
            .take()
            .ok_or(FooterError::MissingPlaceholder)?;
        footer::write_footer(out, placeholder, |config| self.serialize_config(config))?;
        Ok(())
    }

    fn begin_deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<Option<u64>> {
        let ((), data_end) = footer::read_footer(input, |config| self.deserialize_config(config))?;
        Ok(Some(data_end))
    }

    fn serialize_config<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        Descriptor::new(SerializerKind::Schema, self.schema.name())
            .compressed(self.compressor.is_some())
            .metadata(self.metadata.as_deref().cloned())
            .write_bytes(out)?;
        self.schema.descriptor().write_bytes(out)?;
        if let Some(compressor) = &self.compressor {
            out.put_string(compressor.name())?;
        }
        Ok(())
    }

    fn deserialize_config<R: DataInput + ?Sized>(&mut self, input: &mut R) -> Result<()> {
        let descriptor = Descriptor::from_reader(input)?;
        descriptor.expect(SerializerKind::Schema, self.schema.name())?;

        let stored = SchemaDescriptor::from_reader(input)?;
        let registered = self.schema.descriptor();
        if stored != registered {
            return Err(FooterError::TypeMismatch {
                expected: registered.to_string(),
                found: stored.to_string(),
            }
            .into());
        }

        // the stream decides compression, not the caller
        self.compressor = if descriptor.compressed {
            Some(compressor_by_name(&input.get_string()?)?)
        } else {
            None
        };
        self.metadata = descriptor.metadata.map(Arc::new);
        Ok(())
    }
}
