//! # Sorted integer arrays
//!
//! A sorted array is nothing but big-endian `i32` values in non-decreasing
//! order: element `i` lives at byte `i × 4`. No header, no footer.
//!
//! [`SortedIntArray`] answers point lookups and binary searches straight from
//! the memory-mapped file; [`SortedIntWriter`] produces the file and enforces
//! the ordering.

mod reader;
mod writer;

pub use reader::SortedIntArray;
pub use writer::SortedIntWriter;

/// Width of one element in bytes
pub const SIZE_ELEMENT: u64 = 4;
