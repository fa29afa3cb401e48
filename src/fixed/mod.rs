//! # Fixed-size containers
//!
//! A fixed-size container is the raw concatenation of records that all encode
//! to the same number of bytes. There is no index: element `i` lives at
//! `i × record_size` from the start of the data region.
//!
//! | Offset            | Size        | Description                                |
//! | ----------------- | ----------- | ------------------------------------------ |
//! | 0                 | 8           | footer pointer (self-describing only)      |
//! | 0 or 8            | n × size    | records                                    |
//! | pointer           | ...         | footer (self-describing only)              |
//!
//! The record size is not stored. It is discovered by decoding the first
//! element when the container is opened.
//!
//! ```no_run
//! use diskrec::{DiskArray, DirectSerializer, Result};
//! use diskrec::fixed::{FixedDiskArray, FixedWriter};
//!
//! fn main() -> Result<()> {
//!     let mut writer = FixedWriter::create("values.bin", DirectSerializer::<i64>::new())?;
//!     for value in [3i64, 1, 4, 1, 5] {
//!         writer.push(&value)?;
//!     }
//!     writer.finish()?;
//!
//!     let array = FixedDiskArray::<i64>::open_default("values.bin", DirectSerializer::new())?;
//!     assert_eq!(array.len(), 5);
//!     assert_eq!(array.get(2)?, 4);
//!     Ok(())
//! }
//! ```

mod reader;
mod writer;

use std::path::Path;

use crate::error::Result;
use crate::io::FileView;
use crate::serializer::Descriptor;

pub use reader::FixedDiskArray;
pub use writer::FixedWriter;

/// Reads the descriptor of a self-describing fixed-size container
pub fn describe<P: AsRef<Path>>(path: P) -> Result<Descriptor> {
    let view = FileView::open(path)?;
    Descriptor::probe(&mut view.cursor())
}
