//! Deferred deletion.
//!
//! An object cannot be dropped from inside one of its own callbacks. The
//! container instead posts it here, and the owner drains the queue once the
//! callback frame has returned.

use std::any::Any;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type Doomed = Box<dyn Any + Send>;

/// Owner side: collects posted objects and drops them on demand.
#[derive(Debug)]
pub struct DeletionQueue {
    tx: UnboundedSender<Doomed>,
    rx: UnboundedReceiver<Doomed>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> DeletionSender {
        DeletionSender {
            tx: Some(self.tx.clone()),
        }
    }

    /// Drop everything posted so far. Returns how many objects were dropped.
    pub fn run_pending(&mut self) -> usize {
        let mut dropped = 0;
        while let Ok(doomed) = self.rx.try_recv() {
            drop(doomed);
            dropped += 1;
        }
        if dropped > 0 {
            tracing::trace!(dropped, "Ran deferred deletions");
        }
        dropped
    }
}

impl Default for DeletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Posting side of a [`DeletionQueue`].
#[derive(Debug, Clone, Default)]
pub struct DeletionSender {
    tx: Option<UnboundedSender<Doomed>>,
}

impl DeletionSender {
    /// A sender with no queue; posted objects are dropped immediately.
    pub fn immediate() -> Self {
        Self { tx: None }
    }

    /// Post `value` for deletion by the queue owner.
    ///
    /// If the queue is gone the value is dropped here.
    pub fn delete_soon<T: Send + 'static>(&self, value: T) {
        if let Some(tx) = &self.tx {
            // A closed queue hands the value back inside the error, which
            // drops it.
            let _ = tx.send(Box::new(value));
        }
    }
}
