use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, WriteError};
use crate::io::{cint_len, DataInput, DataOutput};
use crate::serializer::ContextRecord;

/// The identity shared by every record of one container
///
/// Supplied at open time instead of being stored per record.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceContext {
    /// Name of the reference sequence the records belong to
    reference: Arc<str>,

    /// File-level metadata document
    metadata: Arc<Value>,
}
impl Default for ReferenceContext {
    fn default() -> Self {
        Self::new("")
    }
}
impl ReferenceContext {
    /// Creates a context with empty metadata
    pub fn new(reference: &str) -> Self {
        Self::with_metadata(reference, Value::Null)
    }

    pub fn with_metadata(reference: &str, metadata: Value) -> Self {
        Self {
            reference: reference.into(),
            metadata: Arc::new(metadata),
        }
    }

    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

/// A sequencing read aligned to a reference, with its nucleotides stored 2-bit packed
///
/// Only the payload (position, flag, and sequence) is written per record. The
/// reference identity comes from the [`ReferenceContext`] the container was
/// opened with.
///
/// Payload layout:
///
/// | Field    | Type               | Description                     |
/// | -------- | ------------------ | ------------------------------- |
/// | position | int                | 0-based leftmost position       |
/// | flag     | long               | implementation-defined bitfield |
/// | slen     | cint               | sequence length in bases        |
/// | sbuf     | long × ⌈slen/32⌉   | 2-bit encoded nucleotides       |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedRead {
    context: ReferenceContext,
    position: u32,
    flag: u64,
    slen: u32,
    sbuf: Vec<u64>,
}
impl AlignedRead {
    /// Encodes `sequence` into a new read
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::InvalidNucleotideSequence`] if the sequence contains
    /// anything other than `A`, `C`, `G`, or `T`.
    pub fn new(
        context: ReferenceContext,
        position: u32,
        flag: u64,
        sequence: &[u8],
    ) -> Result<Self> {
        let mut sbuf = Vec::new();
        if bitnuc::encode(sequence, &mut sbuf).is_err() {
            let seq_str = String::from_utf8_lossy(sequence).to_string();
            return Err(WriteError::InvalidNucleotideSequence(seq_str).into());
        }
        Ok(Self {
            context,
            position,
            flag,
            slen: cint_len(sequence.len())?,
            sbuf,
        })
    }

    #[must_use]
    pub fn reference(&self) -> &str {
        self.context.reference()
    }

    #[must_use]
    pub fn context(&self) -> &ReferenceContext {
        &self.context
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn flag(&self) -> u64 {
        self.flag
    }

    /// Length of the sequence in bases
    #[must_use]
    pub fn slen(&self) -> usize {
        self.slen as usize
    }

    /// The **encoded** sequence
    #[must_use]
    pub fn sbuf(&self) -> &[u64] {
        &self.sbuf
    }

    /// Decodes the sequence into the provided buffer
    pub fn decode_s(&self, buf: &mut Vec<u8>) -> Result<()> {
        bitnuc::decode(&self.sbuf, self.slen(), buf)?;
        Ok(())
    }
}

impl ContextRecord for AlignedRead {
    type Context = ReferenceContext;

    fn serialize_payload<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_int(self.position as i32)?;
        out.put_long(self.flag as i64)?;
        out.put_cint(self.slen)?;
        self.sbuf
            .iter()
            .try_for_each(|&word| out.put_long(word as i64))
    }

    fn deserialize_payload<R: DataInput + ?Sized>(
        &mut self,
        context: &Self::Context,
        input: &mut R,
    ) -> Result<()> {
        self.context.clone_from(context);
        self.position = input.get_int()? as u32;
        self.flag = input.get_long()? as u64;
        self.slen = input.get_cint()?;

        // refill the encoded buffer in place
        let n_chunks = self.slen().div_ceil(32);
        self.sbuf.clear();
        for _ in 0..n_chunks {
            self.sbuf.push(input.get_long()? as u64);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Cursor;

    #[test]
    fn test_payload_excludes_context() -> Result<()> {
        let context = ReferenceContext::new("chr2");
        let sequence = b"ACGTACGTACGTACGTACGTACGTACGTACGTA";
        let read = AlignedRead::new(context.clone(), 100, 3, sequence)?;
        assert_eq!(read.sbuf().len(), 2);

        let mut out = Cursor::new(Vec::new());
        read.serialize_payload(&mut out)?;
        let bytes = out.into_inner();
        // position + flag + cint(33) + two words
        assert_eq!(bytes.len(), 4 + 8 + 1 + 16);

        let mut decoded = AlignedRead::default();
        decoded.deserialize_payload(&context, &mut Cursor::new(bytes.as_slice()))?;
        assert_eq!(decoded, read);
        assert_eq!(decoded.reference(), "chr2");

        let mut dbuf = Vec::new();
        decoded.decode_s(&mut dbuf)?;
        assert_eq!(dbuf, sequence);
        Ok(())
    }

    #[test]
    fn test_invalid_nucleotides() {
        let result = AlignedRead::new(ReferenceContext::new("chr1"), 0, 0, b"ACGN");
        assert!(matches!(
            result,
            Err(Error::WriteError(WriteError::InvalidNucleotideSequence(_)))
        ));
    }
}
