//! # Variable-size containers
//!
//! A variable-size container stores records of any width behind an offset
//! table. Each table entry (a "slot") points at one record or at a group of
//! records written together.
//!
//! | Offset      | Size | Name   | Description                                       |
//! | ----------- | ---- | ------ | ------------------------------------------------- |
//! | 0           | 8    | L      | byte length of the offset table (`slots × 8`)     |
//! | 8           | L    | index  | one `long` per slot, relative to byte 8           |
//! | 8 + L       | ...  | data   | records, optionally framed by a footer            |
//!
//! Because offsets are relative to byte 8, the first slot of a container
//! without a footer always holds `L`. Subtracting `L` from any entry gives its
//! position in the data region.
//!
//! Containers are built in two phases by [`VarWriter`]: records stream into
//! temporary index and data files, and finishing writes the header, the
//! shifted index, and the data into the destination.

mod reader;
mod writer;

use std::path::Path;

use crate::error::{ReadError, Result};
use crate::io::FileView;
use crate::serializer::Descriptor;

pub use reader::VarDiskArray;
pub use writer::{VarWriter, VarWriterBuilder};

/// Size of the table-length header
pub const SIZE_HEADER: u64 = 8;

/// Size of one offset table entry
pub const SIZE_ENTRY: u64 = 8;

/// Reads and validates the table length `L` at the start of `view`
pub(crate) fn read_table_len(view: &FileView) -> Result<u64> {
    let len = view.get_long(0)?;
    let Ok(len) = u64::try_from(len) else {
        return Err(ReadError::InvalidTableLength(len as u64).into());
    };
    if len % SIZE_ENTRY != 0 {
        return Err(ReadError::InvalidTableLength(len).into());
    }
    let required = SIZE_HEADER.saturating_add(len);
    if required > view.size() {
        return Err(ReadError::FileTruncation {
            expected: required,
            found: view.size(),
        }
        .into());
    }
    Ok(len)
}

/// Reads the descriptor of a self-describing variable-size container
pub fn describe<P: AsRef<Path>>(path: P) -> Result<Descriptor> {
    let view = FileView::open(path)?;
    let table_len = read_table_len(&view)?;
    let region = view.tail(SIZE_HEADER + table_len)?;
    Descriptor::probe(&mut region.cursor())
}
