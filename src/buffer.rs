use crate::record::LogEntry;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-guarded accumulator between the ingestion queue and delivery.
///
/// The lock is held only to push an entry or to swap the contents out;
/// serialization and network I/O always happen on the drained batch.
pub(crate) struct BatchBuffer {
    entries: Mutex<Vec<LogEntry>>,
    batch_size: usize,
}

impl BatchBuffer {
    pub(crate) fn new(batch_size: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(batch_size)),
            batch_size,
        }
    }

    /// Append an entry. Returns the full batch when the threshold is reached.
    pub(crate) fn push(&self, entry: LogEntry) -> Option<Vec<LogEntry>> {
        let mut entries = self.lock();
        entries.push(entry);
        if entries.len() >= self.batch_size {
            Some(std::mem::replace(&mut *entries, Vec::with_capacity(self.batch_size)))
        } else {
            None
        }
    }

    /// Swap out everything buffered so far. `None` when empty.
    pub(crate) fn drain(&self) -> Option<Vec<LogEntry>> {
        let mut entries = self.lock();
        if entries.is_empty() {
            None
        } else {
            Some(std::mem::replace(&mut *entries, Vec::with_capacity(self.batch_size)))
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
