use super::RecordSerializer;
use crate::error::Result;
use crate::io::{DataInput, DataOutput};

/// A record shape whose identity is shared by every record of a container
///
/// Only the per-record payload is written; the shared part is the
/// [`Context`](Self::Context) supplied when the container is opened.
pub trait ContextRecord {
    /// The identity bound to every record of one container
    type Context: Clone;

    /// Writes the per-record payload
    fn serialize_payload<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()>;

    /// Reads the per-record payload and binds the record to `context`
    fn deserialize_payload<R: DataInput + ?Sized>(
        &mut self,
        context: &Self::Context,
        input: &mut R,
    ) -> Result<()>;
}

/// Serializes a [`ContextRecord`] bound to a context known at open time
///
/// No footer is written: the context is not recoverable from the file and must
/// be supplied by whoever opens it.
pub struct ContextSerializer<T: ContextRecord> {
    context: T::Context,
}
impl<T: ContextRecord> ContextSerializer<T> {
    pub fn new(context: T::Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &T::Context {
        &self.context
    }
}

impl<T: ContextRecord> Clone for ContextSerializer<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<T: ContextRecord> RecordSerializer<T> for ContextSerializer<T> {
    fn serialize<W: DataOutput + ?Sized>(&mut self, out: &mut W, record: &T) -> Result<()> {
        record.serialize_payload(out)
    }

    fn deserialize<R: DataInput + ?Sized>(&mut self, input: &mut R, record: &mut T) -> Result<()> {
        record.deserialize_payload(&self.context, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Positioned;
    use crate::record::{AlignedRead, ReferenceContext};
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_context_applies_to_every_record() -> Result<()> {
        let context = ReferenceContext::with_metadata("chr1", json!({"sample": "S1"}));
        let mut serializer = ContextSerializer::<AlignedRead>::new(context.clone());

        let reads = [
            AlignedRead::new(context.clone(), 10, 0, b"ACGT")?,
            AlignedRead::new(context.clone(), 42, 16, b"GGGGCCCCAAAATTTTGGGGCCCCAAAATTTTACG")?,
        ];
        let mut out = Cursor::new(Vec::new());
        serializer.begin_serialize(&mut out)?;
        for read in &reads {
            serializer.serialize(&mut out, read)?;
        }
        serializer.end_serialize(&mut out)?;
        let bytes = out.into_inner();

        // no pointer, no footer: only the two payloads
        assert_eq!(bytes.len(), (4 + 8 + 1 + 8) + (4 + 8 + 1 + 16));

        let mut input = Cursor::new(bytes.as_slice());
        assert_eq!(serializer.begin_deserialize(&mut input)?, None);
        assert_eq!(input.tell()?, 0);

        let mut record = AlignedRead::default();
        for read in &reads {
            serializer.deserialize(&mut input, &mut record)?;
            assert_eq!(&record, read);
            assert_eq!(record.context().metadata()["sample"], "S1");
        }
        Ok(())
    }
}
