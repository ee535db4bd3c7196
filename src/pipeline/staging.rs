//! Staging pipeline: dedup gate, staging buffer and batched flushes
//!
//! # Concurrency
//!
//! The duplicate check, the buffer push and the decision to flush all happen
//! under the `state` lock. The batch write itself runs under the `sink` lock
//! only, so producers calling [`StagingPipeline::add`] never wait for a flush
//! in progress. While a flush is outstanding, `add` does not start another;
//! records simply stay buffered for the next `add` or the final drain.

use crate::pipeline::{IdentityIndex, PipelineError, PipelineResult, RecordSink};
use crate::record::Record;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of offering a record to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Record was new and is now buffered (or already persisted)
    Accepted,
    /// A record with the same identity was admitted earlier; this one was dropped
    Duplicate,
}

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Accepting,
    Draining,
}

/// Counters describing what a pipeline has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub admitted: u64,
    pub duplicates: u64,
    pub flushes: u64,
    pub persisted: u64,
    pub buffered: usize,
}

#[derive(Debug)]
struct StagingState {
    buffer: Vec<Record>,
    flushes_in_flight: usize,
    phase: PipelinePhase,
    stats: PipelineStats,
}

/// Dedup-then-buffer pipeline in front of a [`RecordSink`]
pub struct StagingPipeline<S: RecordSink> {
    index: IdentityIndex,
    state: Mutex<StagingState>,
    sink: Mutex<S>,
    batch_threshold: usize,
}

impl<S: RecordSink> StagingPipeline<S> {
    /// Creates a pipeline that flushes once `batch_threshold` records are buffered
    ///
    /// A threshold of zero is treated as one.
    pub fn new(sink: S, batch_threshold: usize) -> Self {
        let batch_threshold = batch_threshold.max(1);
        Self {
            index: IdentityIndex::new(),
            state: Mutex::new(StagingState {
                buffer: Vec::with_capacity(batch_threshold),
                flushes_in_flight: 0,
                phase: PipelinePhase::Accepting,
                stats: PipelineStats::default(),
            }),
            sink: Mutex::new(sink),
            batch_threshold,
        }
    }

    /// Offers a record to the pipeline
    ///
    /// Duplicates are dropped and reported, not treated as errors. When the
    /// buffer reaches the batch threshold and no flush is outstanding, the
    /// buffered batch is written before returning.
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - Whether the record was accepted or dropped
    /// * `Err(PipelineError)` - A triggered flush failed; the run must stop
    pub fn add(&self, record: Record) -> PipelineResult<Admission> {
        let batch = {
            let mut state = self.lock_state();

            let identity = record.identity();
            if self.index.contains_or_register(&identity) {
                state.stats.duplicates += 1;
                tracing::warn!("Duplicate item found: {}. Item dropped.", identity);
                return Ok(Admission::Duplicate);
            }

            state.buffer.push(record);
            state.stats.admitted += 1;

            if state.buffer.len() >= self.batch_threshold && state.flushes_in_flight == 0 {
                Some(self.take_batch(&mut state))
            } else {
                None
            }
        };

        if let Some(batch) = batch {
            self.write_batch(batch)?;
        }

        Ok(Admission::Accepted)
    }

    /// Writes everything currently buffered, if anything
    ///
    /// # Returns
    ///
    /// The number of records written by this call
    pub fn flush(&self) -> PipelineResult<usize> {
        let batch = {
            let mut state = self.lock_state();
            if state.buffer.is_empty() {
                return Ok(0);
            }
            self.take_batch(&mut state)
        };

        let written = batch.len();
        self.write_batch(batch)?;
        Ok(written)
    }

    /// Final, unconditional flush at the end of a pipeline's use
    ///
    /// Callers must have stopped calling `add` before draining. After a
    /// successful drain every admitted record is in storage.
    pub fn drain(&self) -> PipelineResult<PipelineStats> {
        {
            let mut state = self.lock_state();
            if state.phase == PipelinePhase::Draining {
                tracing::warn!("Pipeline drained more than once");
            }
            state.phase = PipelinePhase::Draining;
        }

        let written = self.flush()?;
        tracing::debug!("Drained {} remaining records", written);

        Ok(self.stats())
    }

    pub fn phase(&self) -> PipelinePhase {
        self.lock_state().phase
    }

    pub fn stats(&self) -> PipelineStats {
        let state = self.lock_state();
        PipelineStats {
            buffered: state.buffer.len(),
            ..state.stats
        }
    }

    /// Consumes the pipeline and returns its sink
    pub fn into_sink(self) -> S {
        self.sink.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_batch(&self, state: &mut StagingState) -> Vec<Record> {
        state.flushes_in_flight += 1;
        std::mem::replace(&mut state.buffer, Vec::with_capacity(self.batch_threshold))
    }

    fn write_batch(&self, batch: Vec<Record>) -> PipelineResult<()> {
        let batch_size = batch.len();
        let result = {
            let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
            sink.append_batch(&batch)
        };

        let mut state = self.lock_state();
        state.flushes_in_flight -= 1;

        match result {
            Ok(()) => {
                state.stats.flushes += 1;
                state.stats.persisted += batch_size as u64;
                tracing::debug!("Flushed {} records to storage", batch_size);
                Ok(())
            }
            Err(source) => {
                tracing::error!("Failed to flush {} records: {}", batch_size, source);
                Err(PipelineError::Sink { batch_size, source })
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StagingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
