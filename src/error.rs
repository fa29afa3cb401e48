/// Custom Result type for diskrec operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the diskrec library, encompassing all possible error cases
/// that can occur while building or reading record containers.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to the self-describing footer and serializer config
    FooterError(#[from] FooterError),
    /// Errors that occur during read operations
    ReadError(#[from] ReadError),
    /// Errors that occur during write operations
    WriteError(#[from] WriteError),
    /// Errors raised while encoding or decoding schema-driven records
    SchemaError(#[from] SchemaError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// UTF-8 decoding errors for stored strings
    Utf8Error(#[from] std::string::FromUtf8Error),
    /// Errors from parsing or writing the JSON metadata document
    JsonError(#[from] serde_json::Error),
    /// Errors from the bitnuc nucleotide processing library
    BitnucError(#[from] bitnuc::NucleotideError),
    /// Generic errors that can occur in any part of the system
    AnyhowError(#[from] anyhow::Error),
}

/// Errors raised while resolving the self-describing footer of a stream
///
/// All of these mark the container as corrupt (or opened with the wrong strategy);
/// no partial recovery is attempted.
#[derive(thiserror::Error, Debug)]
pub enum FooterError {
    /// The footer pointer was never patched (the writer did not finish)
    #[error("Footer pointer was never written - the stream was not finished")]
    Unpatched,

    /// The stream was closed without a placeholder to patch
    #[error("end_serialize called before begin_serialize wrote a footer placeholder")]
    MissingPlaceholder,

    /// The footer pointer does not land inside the stream
    ///
    /// # Fields
    /// * `pointer` - The pointer read from the start of the stream
    /// * `len` - The total length of the stream
    #[error("Footer pointer ({pointer}) falls outside the stream (length {len})")]
    InvalidPointer { pointer: u64, len: u64 },

    /// The magic number at the footer position does not match
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid footer magic number: {0:#x}")]
    InvalidMagicNumber(u32),

    /// The config decoder consumed a different number of bytes than were stored
    #[error("Config block declares {expected} bytes but {consumed} were decoded")]
    ConfigLength { expected: u64, consumed: u64 },

    /// The serializer kind byte is not one this library knows
    #[error("Unknown serializer kind: {0}")]
    UnknownKind(u8),

    /// The compressor named in the footer is not one this library provides
    #[error("Unknown compressor: '{0}'")]
    UnknownCompressor(String),

    /// The stored serializer kind differs from the one opening the stream
    #[error("Stream was written by a {found} serializer, expected {expected}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The stored type tag or schema differs from the one opening the stream
    #[error("Stream holds records of type '{found}', expected '{expected}'")]
    TypeMismatch { expected: String, found: String },
}

/// Errors that can occur while reading record containers
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular")]
    IncompatibleFile,

    /// The container is shorter than its own header claims
    ///
    /// # Fields
    /// * `expected` - The number of bytes required by the header
    /// * `found` - The number of bytes available
    #[error("Container truncated: header requires {expected} bytes but only {found} are present")]
    FileTruncation { expected: u64, found: u64 },

    /// The offset-table length in the header is not a multiple of 8
    ///
    /// # Arguments
    /// * `u64` - The invalid table length that was found
    #[error("Offset table length ({0}) is not a multiple of 8")]
    InvalidTableLength(u64),

    /// Attempted to access a record index that is beyond the available range
    ///
    /// # Arguments
    /// * First `usize` - The requested record index
    /// * Second `usize` - The number of records available
    #[error("Requested record index ({0}) is out of record range ({1})")]
    OutOfRange(usize, usize),

    /// A variable-size slot holds no records, so there is no element to decode
    ///
    /// # Arguments
    /// * `usize` - The index of the empty slot
    #[error("Slot {0} holds no records")]
    EmptySlot(usize),

    /// An offset-table entry produces a negative or overflowing byte range
    #[error("Corrupt offsets for slot {index}: [{start}, {end}) is not within the data region ({len} bytes)")]
    CorruptOffsets {
        index: usize,
        start: u64,
        end: u64,
        len: u64,
    },

    /// The record size of a fixed-size container has not been discovered yet
    #[error("Record size unknown - no record has been decoded from this container yet")]
    RecordSizeUnknown,

    /// The first record did not report a fixed size, or decoded from zero bytes
    #[error("Record does not report a fixed size after decoding")]
    NotFixedSize,

    /// The first record reports a wider encoding than was actually decoded
    ///
    /// # Fields
    /// * `reported` - The size returned by the record
    /// * `consumed` - The number of bytes decoding it consumed
    #[error("Record reports a fixed size of {reported} bytes but decoded from {consumed}")]
    FixedSizeMismatch { reported: usize, consumed: u64 },

    /// The data region is not a whole number of fixed-size records
    ///
    /// # Fields
    /// * `bytes` - The size of the data region
    /// * `record_size` - The discovered record size
    #[error("Data region of {bytes} bytes is not a multiple of the record size ({record_size})")]
    PartialRecord { bytes: u64, record_size: usize },

    /// Eager loading would exceed the in-memory array limit
    ///
    /// # Arguments
    /// * First `usize` - The number of records requested
    /// * Second `usize` - The maximum number of records that can be held
    #[error("Cannot load {0} records into memory (limit {1})")]
    CapacityExceeded(usize, usize),

    /// A variable-length integer ran past its maximum width
    #[error("Variable-length integer exceeds 32 bits")]
    VarIntOverflow,
}

/// Errors that can occur while writing record containers
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// A value smaller than its predecessor was appended to a sorted array
    #[error("Sorted array values must be non-decreasing: {next} follows {prev}")]
    UnsortedValue { prev: i32, next: i32 },

    /// The sequence contains invalid nucleotide characters
    ///
    /// # Arguments
    /// * `String` - The sequence that could not be encoded
    #[error("Invalid nucleotides found in sequence: {0}")]
    InvalidNucleotideSequence(String),

    /// A length does not fit in the on-disk width reserved for it
    #[error("Length {0} does not fit in a 32-bit field")]
    LengthOverflow(usize),

    /// A record's encoding differs in size from the first one written
    #[error("Fixed-size record of {got} bytes follows records of {expected} bytes")]
    RecordSizeDrift { expected: u64, got: u64 },
}

/// Errors raised by schema-driven serialization
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    /// A field accessor produced a value of the wrong kind
    #[error("Field '{field}' expects a {expected} value, got {found}")]
    KindMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The field kind tag stored in a footer is unknown
    #[error("Unknown field kind tag: {0}")]
    UnknownKind(u8),

    /// A boolean byte held something other than 0 or 1
    #[error("Invalid boolean byte: {0}")]
    InvalidBool(u8),

    /// The decompressed record did not match its stored length
    #[error("Decompressed record is {found} bytes, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
}
