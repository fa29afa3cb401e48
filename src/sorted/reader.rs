use std::path::Path;

use tracing::debug;

use super::SIZE_ELEMENT;
use crate::error::{ReadError, Result};
use crate::io::FileView;

/// A memory-mapped array of sorted `i32` values
#[derive(Clone)]
pub struct SortedIntArray {
    view: FileView,
}
impl SortedIntArray {
    /// Memory-maps the sorted array at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_view(FileView::open(path)?)
    }

    /// Wraps a view holding a sorted array
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::PartialRecord`] if the view is not a whole number of elements.
    pub fn from_view(view: FileView) -> Result<Self> {
        if view.size() % SIZE_ELEMENT != 0 {
            return Err(ReadError::PartialRecord {
                bytes: view.size(),
                record_size: SIZE_ELEMENT as usize,
            }
            .into());
        }
        debug!(elements = view.size() / SIZE_ELEMENT, "opened sorted array");
        Ok(Self { view })
    }

    /// Number of elements
    #[must_use]
    pub fn size(&self) -> usize {
        (self.view.size() / SIZE_ELEMENT) as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Returns element `index`
    pub fn get(&self, index: usize) -> Result<i32> {
        if index >= self.size() {
            return Err(ReadError::OutOfRange(index, self.size()).into());
        }
        self.view.get_int(index as u64 * SIZE_ELEMENT)
    }

    /// Searches `[lo, hi)` for `key`
    ///
    /// # Returns
    ///
    /// The index of a matching element if there is one (any of them, when the
    /// key repeats), or `-(insertion_point + 1)` otherwise, where the insertion
    /// point is the index of the first element greater than `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::OutOfRange`] if the range does not lie within the array.
    pub fn binary_search(&self, key: i32, lo: usize, hi: usize) -> Result<isize> {
        if lo > hi || hi > self.size() {
            return Err(ReadError::OutOfRange(hi.max(lo), self.size()).into());
        }

        let mut low = lo;
        let mut high = hi;
        while low < high {
            let mid = low + (high - low) / 2;
            let value = self.get(mid)?;
            if value < key {
                low = mid + 1;
            } else if value > key {
                high = mid;
            } else {
                return Ok(mid as isize);
            }
        }
        Ok(-(low as isize) - 1)
    }

    /// Searches the whole array for `key`
    pub fn binary_search_all(&self, key: i32) -> Result<isize> {
        self.binary_search(key, 0, self.size())
    }
}
