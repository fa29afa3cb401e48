//! Schema-driven record encoding
//!
//! A [`Schema`] is an explicit, ordered list of named, typed fields, each with
//! an accessor pair. It is compiled once into encode/decode closures, so a
//! record is written by running the field closures in order with no runtime
//! type inspection.
//!
//! ```
//! use diskrec::Schema;
//!
//! #[derive(Default)]
//! struct Peak {
//!     name: String,
//!     start: i32,
//!     score: f64,
//! }
//!
//! let schema = Schema::<Peak>::new("peak")
//!     .string_field("name", |p| p.name.as_str(), |p, v| p.name = v)
//!     .int_field("start", |p| p.start, |p, v| p.start = v)
//!     .double_field("score", |p| p.score, |p, v| p.score = v);
//! assert_eq!(schema.len(), 3);
//! ```

mod buffer;
mod serializer;

use std::fmt;

use crate::error::{Result, SchemaError};
use crate::io::{DataInput, DataOutput};

pub use buffer::ScratchBuffer;
pub use serializer::SchemaSerializer;

type EncodeFn<T> = Box<dyn Fn(&T, &mut ScratchBuffer) -> Result<()> + Send + Sync>;
type DecodeFn<T> = Box<dyn Fn(&mut T, &mut ScratchBuffer) -> Result<()> + Send + Sync>;

/// The wire kind of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One byte, `0` or `1`
    Bool,
    /// 4-byte integer
    Int,
    /// 8-byte integer
    Long,
    /// Variable-length unsigned integer
    CInt,
    /// 8-byte IEEE-754 float
    Double,
    /// Length-prefixed UTF-8 string
    Str,
    /// Length-prefixed opaque bytes
    Bytes,
}
impl FieldKind {
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Int => 1,
            Self::Long => 2,
            Self::CInt => 3,
            Self::Double => 4,
            Self::Str => 5,
            Self::Bytes => 6,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => Self::Bool,
            1 => Self::Int,
            2 => Self::Long,
            3 => Self::CInt,
            4 => Self::Double,
            5 => Self::Str,
            6 => Self::Bytes,
            _ => return Err(SchemaError::UnknownKind(byte).into()),
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::CInt => "cint",
            Self::Double => "double",
            Self::Str => "string",
            Self::Bytes => "bytes",
        }
    }
}

/// A dynamically typed field value, for records whose shape is only known at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    CInt(u32),
    Double(f64),
    Str(String),
    Bytes(Vec<u8>),
}
impl FieldValue {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::Int(_) => FieldKind::Int,
            Self::Long(_) => FieldKind::Long,
            Self::CInt(_) => FieldKind::CInt,
            Self::Double(_) => FieldKind::Double,
            Self::Str(_) => FieldKind::Str,
            Self::Bytes(_) => FieldKind::Bytes,
        }
    }

    fn write<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        match self {
            Self::Bool(v) => out.put_byte(u8::from(*v)),
            Self::Int(v) => out.put_int(*v),
            Self::Long(v) => out.put_long(*v),
            Self::CInt(v) => out.put_cint(*v),
            Self::Double(v) => out.put_double(*v),
            Self::Str(v) => out.put_string(v),
            Self::Bytes(v) => put_length_prefixed(out, v),
        }
    }

    fn read<R: DataInput + ?Sized>(kind: FieldKind, input: &mut R) -> Result<Self> {
        Ok(match kind {
            FieldKind::Bool => Self::Bool(get_bool(input)?),
            FieldKind::Int => Self::Int(input.get_int()?),
            FieldKind::Long => Self::Long(input.get_long()?),
            FieldKind::CInt => Self::CInt(input.get_cint()?),
            FieldKind::Double => Self::Double(input.get_double()?),
            FieldKind::Str => Self::Str(input.get_string()?),
            FieldKind::Bytes => {
                let len = input.get_cint()? as usize;
                Self::Bytes(input.get_vec(len)?)
            }
        })
    }
}

fn get_bool<R: DataInput + ?Sized>(input: &mut R) -> Result<bool> {
    match input.get_byte()? {
        0 => Ok(false),
        1 => Ok(true),
        byte => Err(SchemaError::InvalidBool(byte).into()),
    }
}

fn put_length_prefixed<W: DataOutput + ?Sized>(out: &mut W, bytes: &[u8]) -> Result<()> {
    out.put_cint(crate::io::cint_len(bytes.len())?)?;
    out.put_bytes(bytes)
}

/// One compiled field of a [`Schema`]
struct Field<T> {
    name: String,
    kind: FieldKind,
    encode: EncodeFn<T>,
    decode: DecodeFn<T>,
}

/// An explicit description of how records of type `T` are encoded
///
/// Fields are written in the order they were added.
pub struct Schema<T> {
    name: String,
    fields: Vec<Field<T>>,
}
impl<T: 'static> Schema<T> {
    /// Starts an empty schema. `name` identifies the record shape in footers.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the name and kind of every field, in order
    #[must_use]
    pub fn descriptor(&self) -> SchemaDescriptor {
        SchemaDescriptor {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.kind))
                .collect(),
        }
    }

    /// Runs every field encoder against `record`
    pub fn encode(&self, record: &T, out: &mut ScratchBuffer) -> Result<()> {
        self.fields
            .iter()
            .try_for_each(|field| (field.encode)(record, out))
    }

    /// Runs every field decoder into `record`
    pub fn decode(&self, record: &mut T, input: &mut ScratchBuffer) -> Result<()> {
        self.fields
            .iter()
            .try_for_each(|field| (field.decode)(record, input))
    }

    fn push(mut self, name: &str, kind: FieldKind, encode: EncodeFn<T>, decode: DecodeFn<T>) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            kind,
            encode,
            decode,
        });
        self
    }

    /// Adds a fixed-width or integer field whose value is copied in and out
    fn scalar<V, G, S, E, D>(self, name: &str, kind: FieldKind, get: G, set: S, write: E, read: D) -> Self
    where
        V: 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
        E: Fn(&mut ScratchBuffer, V) -> Result<()> + Send + Sync + 'static,
        D: Fn(&mut ScratchBuffer) -> Result<V> + Send + Sync + 'static,
    {
        let encode = Box::new(move |record: &T, out: &mut ScratchBuffer| write(out, get(record)));
        let decode = Box::new(move |record: &mut T, input: &mut ScratchBuffer| {
            set(record, read(input)?);
            Ok(())
        });
        self.push(name, kind, encode, decode)
    }

    #[must_use]
    pub fn bool_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> bool + Send + Sync + 'static,
        S: Fn(&mut T, bool) + Send + Sync + 'static,
    {
        self.scalar(
            name,
            FieldKind::Bool,
            get,
            set,
            |out, v| out.put_byte(u8::from(v)),
            |input| get_bool(input),
        )
    }

    #[must_use]
    pub fn int_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> i32 + Send + Sync + 'static,
        S: Fn(&mut T, i32) + Send + Sync + 'static,
    {
        self.scalar(
            name,
            FieldKind::Int,
            get,
            set,
            |out, v| out.put_int(v),
            |input| input.get_int(),
        )
    }

    #[must_use]
    pub fn long_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> i64 + Send + Sync + 'static,
        S: Fn(&mut T, i64) + Send + Sync + 'static,
    {
        self.scalar(
            name,
            FieldKind::Long,
            get,
            set,
            |out, v| out.put_long(v),
            |input| input.get_long(),
        )
    }

    /// Adds an unsigned field stored as a cint (1-5 bytes)
    #[must_use]
    pub fn cint_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> u32 + Send + Sync + 'static,
        S: Fn(&mut T, u32) + Send + Sync + 'static,
    {
        self.scalar(
            name,
            FieldKind::CInt,
            get,
            set,
            |out, v| out.put_cint(v),
            |input| input.get_cint(),
        )
    }

    #[must_use]
    pub fn double_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> f64 + Send + Sync + 'static,
        S: Fn(&mut T, f64) + Send + Sync + 'static,
    {
        self.scalar(
            name,
            FieldKind::Double,
            get,
            set,
            |out, v| out.put_double(v),
            |input| input.get_double(),
        )
    }

    /// Adds a string field; the getter borrows from the record
    #[must_use]
    pub fn string_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> &str + Send + Sync + 'static,
        S: Fn(&mut T, String) + Send + Sync + 'static,
    {
        let encode = Box::new(move |record: &T, out: &mut ScratchBuffer| out.put_string(get(record)));
        let decode = Box::new(move |record: &mut T, input: &mut ScratchBuffer| {
            set(record, input.get_string()?);
            Ok(())
        });
        self.push(name, FieldKind::Str, encode, decode)
    }

    /// Adds a length-prefixed byte field; the getter borrows from the record
    #[must_use]
    pub fn bytes_field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> &[u8] + Send + Sync + 'static,
        S: Fn(&mut T, Vec<u8>) + Send + Sync + 'static,
    {
        let encode =
            Box::new(move |record: &T, out: &mut ScratchBuffer| put_length_prefixed(out, get(record)));
        let decode = Box::new(move |record: &mut T, input: &mut ScratchBuffer| {
            let len = input.get_cint()? as usize;
            set(record, input.get_vec(len)?);
            Ok(())
        });
        self.push(name, FieldKind::Bytes, encode, decode)
    }

    /// Adds a dynamically typed field
    ///
    /// The getter must produce a value of `kind`; anything else fails the write
    /// with [`SchemaError::KindMismatch`].
    #[must_use]
    pub fn field<G, S>(self, name: &str, kind: FieldKind, get: G, set: S) -> Self
    where
        G: Fn(&T) -> FieldValue + Send + Sync + 'static,
        S: Fn(&mut T, FieldValue) + Send + Sync + 'static,
    {
        let field = name.to_string();
        let encode = Box::new(move |record: &T, out: &mut ScratchBuffer| {
            let value = get(record);
            if value.kind() != kind {
                return Err(SchemaError::KindMismatch {
                    field: field.clone(),
                    expected: kind.name(),
                    found: value.kind().name(),
                }
                .into());
            }
            value.write(out)
        });
        let decode = Box::new(move |record: &mut T, input: &mut ScratchBuffer| {
            set(record, FieldValue::read(kind, input)?);
            Ok(())
        });
        self.push(name, kind, encode, decode)
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field(
                "fields",
                &self
                    .fields
                    .iter()
                    .map(|field| (&field.name, field.kind))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The stored shape of a schema: its name and the name and kind of each field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub name: String,
    pub fields: Vec<(String, FieldKind)>,
}
impl SchemaDescriptor {
    pub fn write_bytes<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.put_string(&self.name)?;
        out.put_cint(crate::io::cint_len(self.fields.len())?)?;
        for (name, kind) in &self.fields {
            out.put_string(name)?;
            out.put_byte(kind.as_byte())?;
        }
        Ok(())
    }

    pub fn from_reader<R: DataInput + ?Sized>(input: &mut R) -> Result<Self> {
        let name = input.get_string()?;
        let n_fields = input.get_cint()?;
        let mut fields = Vec::new();
        for _ in 0..n_fields {
            let field = input.get_string()?;
            let kind = FieldKind::from_byte(input.get_byte()?)?;
            fields.push((field, kind));
        }
        Ok(Self { name, fields })
    }
}
impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, kind)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {}", kind.name())?;
        }
        write!(f, ")")
    }
}
