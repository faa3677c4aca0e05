//! [`Buffer`] — owning or aliasing storage for one port's worth of samples.
//!
//! Grounded on `original_source/Signal.h`: a buffer either owns its vector
//! (`owner = true`) or shares another buffer's vector (`owner = false`),
//! and a shared vector can be flagged `borrowed` so the owner knows someone
//! else is now relying on it for in-place reuse.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::GraphError;
use crate::sample::{clear, Sample};

/// A fixed-length run of samples, owned or aliased.
///
/// `storage` is reference-counted rather than borrowed so that an Input
/// Port's source list can hold independent handles onto an Output Port's
/// buffer without the two ports sharing a Rust lifetime — the engine's own
/// topological-order execution, not the borrow checker, is what guarantees
/// no two nodes touch a buffer at overlapping times. The interior mutability
/// is a `Mutex` rather than a `RefCell`: a `RefCell` (like a plain `Cell`)
/// is never `Sync`, so `Arc<RefCell<_>>` would make `Buffer` — and every type
/// that embeds one, up through `Graph` itself — neither `Send` nor `Sync`,
/// which is incompatible with handing `Arc<Graph>` to an audio-callback
/// thread per SPEC_FULL.md §5's two-thread model. The lock is never actually
/// contended: the structural lock in `Graph` already serializes every
/// caller, so this `Mutex` exists purely to satisfy `Sync`, not to arbitrate
/// real concurrent access.
#[derive(Clone)]
pub struct Buffer {
    storage: Arc<Mutex<Vec<Sample>>>,
    owner: bool,
    borrowed: Arc<AtomicBool>,
}

impl Buffer {
    /// Allocate a fresh, owning, zero-filled buffer of length `len`.
    pub fn allocate(len: usize) -> Result<Self, GraphError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| GraphError::AllocationFailure)?;
        data.resize(len, 0.0);
        Ok(Self {
            storage: Arc::new(Mutex::new(data)),
            owner: true,
            borrowed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Produce a non-owning view of `other`'s storage. If `mark_borrowed`,
    /// flags `other` as borrowed so its owner knows another port now
    /// depends on this storage remaining intact (used for in-place reuse).
    pub fn alias(other: &Buffer, mark_borrowed: bool) -> Self {
        if mark_borrowed {
            other.borrowed.store(true, Ordering::Relaxed);
        }
        Self {
            storage: Arc::clone(&other.storage),
            owner: false,
            borrowed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn is_borrowed(&self) -> bool {
        self.borrowed.load(Ordering::Relaxed)
    }

    /// True if `self` and `other` alias the same underlying storage.
    pub fn aliases(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Zero the buffer's contents in place.
    pub fn clear(&self) {
        clear(&mut self.lock());
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A read-only view for summation / downstream consumption.
    pub fn read_view(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.lock()
    }

    /// A mutable view for a node's `perform` callback to write into.
    pub fn write_view(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.lock()
    }
}
