//! Scoped mutation context (C7 support): every Workflow-state mutation is
//! tagged with an event id for history, acquired on entry and released on
//! every exit path. Grounded in `ct/state.py`'s `__call__`/`__enter__`/
//! `__exit__` context manager, reimplemented as a scope guard since Rust
//! has no `with` statement.
//!
//! On a normal exit the context is cleared; on an unwinding panic it is
//! left set, mirroring the source's "context survives an exception for
//! post-hoc debugging" behavior.

/// RAII guard over one event id. Borrows the `Option<u64>` slot it set so
/// the holder (`WorkflowState`) can assert no second context is acquired
/// while this one is alive.
pub struct MutationContext<'a> {
    event_id: u64,
    slot: &'a mut Option<u64>,
}

impl<'a> MutationContext<'a> {
    /// Acquire a context over `slot`. Panics (a [`crate::error::CoreError`]
    /// ProgrammingError condition) if `slot` already holds a context —
    /// reentrant double-entry is a bug, not a data condition.
    pub fn acquire(slot: &'a mut Option<u64>, event_id: u64) -> Self {
        assert!(
            slot.is_none(),
            "reentrant context entry: already in context {:?}",
            slot
        );
        *slot = Some(event_id);
        Self { event_id, slot }
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }
}

impl<'a> Drop for MutationContext<'a> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            *self.slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_slot_on_normal_drop() {
        let mut slot = None;
        {
            let ctx = MutationContext::acquire(&mut slot, 7);
            assert_eq!(ctx.event_id(), 7);
        }
        assert_eq!(slot, None);
    }

    #[test]
    #[should_panic(expected = "reentrant context entry")]
    fn reentrant_acquire_panics() {
        let mut slot = Some(1);
        let _ctx = MutationContext::acquire(&mut slot, 2);
    }
}
