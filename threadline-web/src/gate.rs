use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Admission control in front of the shared browser.
///
/// A counting semaphore; permits are RAII so the slot is returned exactly once
/// on every exit path, including `?` and panics.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    ceiling: usize,
}

/// An admission ticket. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// `ceiling` is clamped to at least 1.
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(ceiling)),
            ceiling,
        }
    }

    /// Wait for a free slot. Fails only once the gate has been [closed](Self::close).
    pub async fn acquire(&self) -> Result<GatePermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        Ok(GatePermit { _permit: permit })
    }

    /// Refuse new admissions; waiters and later callers get an error.
    /// Permits already handed out stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.ceiling.saturating_sub(self.semaphore.available_permits())
    }
}
