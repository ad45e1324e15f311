//! Message allocation policies.
//!
//! The ID layer asks its allocator for an instance of the message type
//! it resolved from the wire. Policy is a per-stack construction-time
//! choice: [`HeapAlloc`] boxes each message, [`SingleSlotAlloc`] hands
//! out a single inline slot and fails a second live allocation instead
//! of invoking any undefined behavior.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::{CodecError, Result};

/// Produces message instances for the ID layer.
pub trait MsgAllocator<M> {
    /// Smart-pointer type handed back to the caller.
    type Ptr: Deref<Target = M> + DerefMut;

    /// Wrap `msg`; fails with [`CodecError::AllocFailure`] when the
    /// policy cannot accept another live message.
    fn allocate(&self, msg: M) -> Result<Self::Ptr>;
}

/// Heap-backed policy; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAlloc;

impl<M> MsgAllocator<M> for HeapAlloc {
    type Ptr = Box<M>;

    fn allocate(&self, msg: M) -> Result<Box<M>> {
        Ok(Box::new(msg))
    }
}

/// Single-slot policy: at most one live message at a time.
///
/// The message itself lives inline in the returned guard; the shared
/// flag only tracks occupancy, so dropping the guard frees the slot.
#[derive(Debug, Clone, Default)]
pub struct SingleSlotAlloc {
    occupied: Rc<Cell<bool>>,
}

impl SingleSlotAlloc {
    /// Fresh, unoccupied slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message from this allocator is still alive.
    #[must_use]
    pub fn occupied(&self) -> bool {
        self.occupied.get()
    }
}

impl<M> MsgAllocator<M> for SingleSlotAlloc {
    type Ptr = SlotGuard<M>;

    fn allocate(&self, msg: M) -> Result<SlotGuard<M>> {
        if self.occupied.get() {
            return Err(CodecError::AllocFailure);
        }
        self.occupied.set(true);
        Ok(SlotGuard {
            msg,
            occupied: Rc::clone(&self.occupied),
        })
    }
}

/// Live message handed out by a [`SingleSlotAlloc`].
#[derive(Debug)]
pub struct SlotGuard<M> {
    msg: M,
    occupied: Rc<Cell<bool>>,
}

impl<M> Deref for SlotGuard<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.msg
    }
}

impl<M> DerefMut for SlotGuard<M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.msg
    }
}

impl<M> Drop for SlotGuard<M> {
    fn drop(&mut self) {
        self.occupied.set(false);
    }
}
