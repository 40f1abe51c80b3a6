//! Single-slot deferred update, applied at the next frame boundary.
//!
//! Scheduling while an update is pending replaces it, so at most one update
//! is ever waiting and only the most recent one survives to the frame.

/// Opaque handle to a scheduled update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

#[derive(Debug)]
pub struct FrameSlot<T> {
    next_handle: u64,
    pending: Option<(FrameHandle, T)>,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self {
            next_handle: 0,
            pending: None,
        }
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `update`, cancelling whatever was pending.
    pub fn schedule(&mut self, update: T) -> FrameHandle {
        if let Some((superseded, _)) = self.pending.take() {
            tracing::trace!(handle = superseded.0, "coalesced pending frame update");
        }
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some((handle, update));
        handle
    }

    /// Drops the pending update without applying it.
    pub fn cancel(&mut self) -> Option<FrameHandle> {
        self.pending.take().map(|(handle, _)| handle)
    }

    /// Callback for a specific scheduled frame. A cancelled or superseded
    /// handle yields nothing.
    pub fn fire(&mut self, handle: FrameHandle) -> Option<T> {
        if self.pending() == Some(handle) {
            self.take()
        } else {
            None
        }
    }

    /// Frame boundary: yields the pending update, if any.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(_, update)| update)
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending.as_ref().map(|(handle, _)| *handle)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
