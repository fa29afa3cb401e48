//! # Parallel processing
//!
//! Any [`DiskArray`] can be processed in parallel: the index range is split
//! into contiguous per-thread chunks, every thread decodes its chunk with its
//! own serializer and record, and hands each record to its own clone of a
//! [`ParallelProcessor`].
//!
//! ```no_run
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! use diskrec::fixed::FixedDiskArray;
//! use diskrec::{DirectSerializer, ParallelProcessor, ParallelReader, Result};
//!
//! #[derive(Clone, Default)]
//! struct Total(Arc<AtomicU64>);
//! impl ParallelProcessor<i64> for Total {
//!     fn process_record(&mut self, _index: usize, record: &i64) -> Result<()> {
//!         self.0.fetch_add(*record as u64, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let array = FixedDiskArray::<i64>::open_default("values.bin", DirectSerializer::new())?;
//!     let total = Total::default();
//!     array.process_parallel(total.clone(), 0)?;
//!     println!("{}", total.0.load(Ordering::Relaxed));
//!     Ok(())
//! }
//! ```

use std::ops::Range;
use std::sync::Arc;

use crate::array::DiskArray;
use crate::error::{ReadError, Result};

/// Number of records between calls to [`ParallelProcessor::on_batch_complete`]
pub const BATCH_SIZE: usize = 1024;

/// Trait for arrays that can process their records in parallel
///
/// This is implemented by the **reader** not by the **processor**.
/// For the **processor**, see the [`ParallelProcessor`] trait.
pub trait ParallelReader {
    /// The record type handed to processors
    type Item;

    /// Processes every record
    ///
    /// `num_threads == 0` uses every available CPU; larger counts are capped
    /// by the number of CPUs.
    fn process_parallel<P: ParallelProcessor<Self::Item> + 'static>(
        self,
        processor: P,
        num_threads: usize,
    ) -> Result<()>;

    /// Processes the records with indices in `range`
    fn process_parallel_range<P: ParallelProcessor<Self::Item> + 'static>(
        self,
        processor: P,
        num_threads: usize,
        range: Range<usize>,
    ) -> Result<()>;
}

/// Trait for types that can process records in parallel.
///
/// This is implemented by the **processor** not by the **reader**.
/// For the **reader**, see the [`ParallelReader`] trait.
pub trait ParallelProcessor<T>: Send + Clone {
    /// Process a single record
    fn process_record(&mut self, index: usize, record: &T) -> Result<()>;

    /// Called after every batch of [`BATCH_SIZE`] records and after the last record of a thread
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread calls this method with its own unique ID.
    #[allow(unused_variables)]
    fn set_tid(&mut self, tid: usize) {}

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

impl<A> ParallelReader for A
where
    A: DiskArray + Send + Sync + 'static,
{
    type Item = A::Item;

    fn process_parallel<P: ParallelProcessor<Self::Item> + 'static>(
        self,
        processor: P,
        num_threads: usize,
    ) -> Result<()> {
        let num_records = self.len();
        self.process_parallel_range(processor, num_threads, 0..num_records)
    }

    fn process_parallel_range<P: ParallelProcessor<Self::Item> + 'static>(
        self,
        processor: P,
        num_threads: usize,
        range: Range<usize>,
    ) -> Result<()> {
        // Calculate the number of threads to use
        let num_threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads.min(num_cpus::get())
        };

        // Validate range
        let num_records = self.len();
        if range.end > num_records {
            return Err(ReadError::OutOfRange(range.end, num_records).into());
        }
        if range.start >= range.end {
            return Ok(());
        }

        // Calculate number of records for each thread within the range
        let records_per_thread = range.len().div_ceil(num_threads);
        let Range { start, end } = range;
        let array = Arc::new(self);

        let mut handles = Vec::with_capacity(num_threads);
        for tid in 0..num_threads {
            let mut processor = processor.clone();
            let array = array.clone();
            processor.set_tid(tid);

            let handle = std::thread::spawn(move || -> Result<()> {
                let start_idx = start + tid * records_per_thread;
                let end_idx = (start_idx + records_per_thread).min(end);
                if start_idx >= end_idx {
                    return Ok(()); // No records for this thread
                }

                // per-thread decoding state
                let mut serializer = array.serializer().clone();
                let mut record = array.prototype();

                for batch_start in (start_idx..end_idx).step_by(BATCH_SIZE) {
                    let batch_end = (batch_start + BATCH_SIZE).min(end_idx);
                    for idx in batch_start..batch_end {
                        array.decode_into(&mut serializer, &mut record, idx)?;
                        processor.process_record(idx, &record)?;
                    }
                    processor.on_batch_complete()?;
                }
                Ok(())
            });
            handles.push(handle);
        }

        // surface the first failure after every worker has stopped
        let mut result = Ok(());
        for handle in handles {
            let outcome = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow::anyhow!("parallel worker thread panicked").into()),
            };
            if result.is_ok() {
                result = outcome;
            }
        }
        result
    }
}
