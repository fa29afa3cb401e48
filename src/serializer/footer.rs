//! Footer placement and the common config prefix
//!
//! A self-describing stream starts with an 8-byte pointer. The pointer is
//! written as `0` before any record, and patched to the absolute footer
//! position once the footer has been written. Opening a stream whose pointer is
//! still `0` fails with [`FooterError::Unpatched`].
//!
//! Every strategy that writes a footer starts its config block with a
//! [`Descriptor`], so a reader can tell what produced a file without knowing
//! the record type up front (see [`Descriptor::probe`]).

use std::io::Cursor;

use serde_json::Value;
use tracing::trace;

use crate::error::{FooterError, Result};
use crate::io::{DataInput, DataOutput, Positioned};

/// Footer magic number: "DRFT" in ASCII
pub const FOOTER_MAGIC: u32 = 0x4452_4654;

/// Size of the footer pointer at the start of the stream
pub const SIZE_POINTER: u64 = 8;

/// Size of the footer frame preceding the config block (magic + length)
pub const SIZE_FRAME: u64 = 12;

/// Pointer value written before the footer exists
const UNPATCHED: i64 = 0;

/// Writes the footer pointer placeholder and returns where it was written
pub fn write_placeholder<W: DataOutput + ?Sized>(out: &mut W) -> Result<u64> {
    let pos = out.tell()?;
    out.put_long(UNPATCHED)?;
    Ok(pos)
}

/// Writes the footer at the current position and patches the pointer at `placeholder`
///
/// `write_config` encodes the config block into a scratch buffer first, so its
/// length is known before the frame is written. On return the stream is
/// positioned after the footer.
///
/// # Returns
///
/// The absolute position of the footer, which is also where record data ends.
pub fn write_footer<W, F>(out: &mut W, placeholder: u64, write_config: F) -> Result<u64>
where
    W: DataOutput + ?Sized,
    F: FnOnce(&mut Cursor<Vec<u8>>) -> Result<()>,
{
    let mut config = Cursor::new(Vec::new());
    write_config(&mut config)?;
    let config = config.into_inner();

    let footer = out.tell()?;
    out.put_int(FOOTER_MAGIC as i32)?;
    out.put_long(config.len() as i64)?;
    out.put_bytes(&config)?;
    let end = out.tell()?;

    trace!(placeholder, footer, config_len = config.len(), "patching footer pointer");
    out.seek_to(placeholder)?;
    out.put_long(footer as i64)?;
    out.seek_to(end)?;
    Ok(footer)
}

/// Locates and decodes the footer of the stream starting at the current position of `input`
///
/// `read_config` is handed a cursor over exactly the config block and must
/// consume all of it. On return `input` is positioned just after the pointer,
/// at the first record.
///
/// # Returns
///
/// The value produced by `read_config`, and the absolute footer position.
///
/// # Errors
///
/// * [`FooterError::Unpatched`] if the stream was never finished
/// * [`FooterError::InvalidPointer`] if the pointer or config length run outside the stream
/// * [`FooterError::InvalidMagicNumber`] if the footer frame is not where the pointer says
/// * [`FooterError::ConfigLength`] if `read_config` did not consume the whole block
pub fn read_footer<R, T, F>(input: &mut R, read_config: F) -> Result<(T, u64)>
where
    R: DataInput + ?Sized,
    F: FnOnce(&mut Cursor<&[u8]>) -> Result<T>,
{
    let start = input.tell()?;
    let len = input.end_position()?;
    let pointer = input.get_long()?;
    if pointer == UNPATCHED {
        return Err(FooterError::Unpatched.into());
    }

    let pointer = pointer as u64;
    if pointer < start + SIZE_POINTER || pointer.saturating_add(SIZE_FRAME) > len {
        return Err(FooterError::InvalidPointer { pointer, len }.into());
    }

    input.seek_to(pointer)?;
    let magic = input.get_int()? as u32;
    if magic != FOOTER_MAGIC {
        return Err(FooterError::InvalidMagicNumber(magic).into());
    }
    let config_len = input.get_long()? as u64;
    if config_len > len - pointer - SIZE_FRAME {
        return Err(FooterError::InvalidPointer { pointer, len }.into());
    }
    let config = input.get_vec(config_len as usize)?;

    let mut cursor = Cursor::new(config.as_slice());
    let value = read_config(&mut cursor)?;
    let consumed = cursor.position();
    if consumed != config_len {
        return Err(FooterError::ConfigLength {
            expected: config_len,
            consumed,
        }
        .into());
    }

    input.seek_to(start + SIZE_POINTER)?;
    Ok((value, pointer))
}

/// The strategy that produced a self-describing stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializerKind {
    /// Records encoded by their own [`Record`](crate::Record) implementation
    Direct,
    /// Records encoded through a field [`Schema`](super::Schema)
    Schema,
}
impl SerializerKind {
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Direct => 1,
            Self::Schema => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Self::Direct),
            2 => Ok(Self::Schema),
            _ => Err(FooterError::UnknownKind(byte).into()),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Schema => "schema",
        }
    }
}

/// The common prefix of every config block
///
/// | Field      | Type   | Description                                   |
/// | ---------- | ------ | --------------------------------------------- |
/// | kind       | byte   | [`SerializerKind`]                            |
/// | tag        | string | record type tag or schema name                |
/// | compressed | byte   | `1` if records are individually compressed    |
/// | has_meta   | byte   | `1` if a metadata document follows            |
/// | metadata   | string | JSON document (only present if `has_meta`)    |
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub kind: SerializerKind,
    pub tag: String,
    pub compressed: bool,
    pub metadata: Option<Value>,
}
impl Descriptor {
    pub fn new(kind: SerializerKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            compressed: false,
            metadata: None,
        }
    }

    #[must_use]
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn write_bytes<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_byte(self.kind.as_byte())?;
        out.put_string(&self.tag)?;
        out.put_byte(u8::from(self.compressed))?;
        match &self.metadata {
            Some(metadata) => {
                out.put_byte(1)?;
                out.put_string(&serde_json::to_string(metadata)?)
            }
            None => out.put_byte(0),
        }
    }

    pub fn from_reader<R: DataInput + ?Sized>(input: &mut R) -> Result<Self> {
        let kind = SerializerKind::from_byte(input.get_byte()?)?;
        let tag = input.get_string()?;
        let compressed = input.get_byte()? != 0;
        let metadata = match input.get_byte()? {
            0 => None,
            _ => Some(serde_json::from_str(&input.get_string()?)?),
        };
        Ok(Self {
            kind,
            tag,
            compressed,
            metadata,
        })
    }

    /// Checks that the stream was written by the expected strategy for the expected type
    pub fn expect(&self, kind: SerializerKind, tag: &str) -> Result<()> {
        if self.kind != kind {
            return Err(FooterError::KindMismatch {
                expected: kind.name(),
                found: self.kind.name(),
            }
            .into());
        }
        if self.tag != tag {
            return Err(FooterError::TypeMismatch {
                expected: tag.to_string(),
                found: self.tag.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Reads the descriptor of the stream starting at the current position of `input`
    ///
    /// The strategy-specific remainder of the config block is skipped.
    pub fn probe<R: DataInput + ?Sized>(input: &mut R) -> Result<Self> {
        let (descriptor, _) = read_footer(input, |config| {
            let descriptor = Self::from_reader(config)?;
            let end = config.get_ref().len() as u64;
            config.seek_to(end)?;
            Ok(descriptor)
        })?;
        Ok(descriptor)
    }
}
