//! Message-ID layer: decodes the ID field, allocates the matching
//! message type, and delegates payload handling inward.

use core::marker::PhantomData;

use tracing::{debug, trace};

use crate::alloc::MsgAllocator;
use crate::cursor::{PatchCursor, ReadCursor, WriteCursor};
use crate::endian::WireInt;
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{Field, ValueField};
use crate::message::{Message, MessageSet};
use crate::stack::{
    read_patch_field, record_field, widen_missing, Decoded, FrameLayer, MsgLayer, Trace,
};

/// Protocol layer owning the message-ID transport field.
///
/// On read it decodes the ID, looks the message type up in the closed
/// set `S`, asks allocator `A` for an instance, then delegates payload
/// reading to the inner layer. Unknown IDs fail with
/// [`CodecError::InvalidMsgId`]; allocator refusal with
/// [`CodecError::AllocFailure`]. When several messages share an ID,
/// candidates are tried at increasing index until one reads cleanly.
pub struct MsgIdLayer<F, S, A, N> {
    alloc: A,
    next: N,
    _marker: PhantomData<(F, S)>,
}

impl<F, S, A, N> MsgIdLayer<F, S, A, N> {
    /// Compose over the inner layer with an allocation policy.
    pub fn new(alloc: A, next: N) -> Self {
        Self {
            alloc,
            next,
            _marker: PhantomData,
        }
    }

    /// The allocation policy.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<F, S, A, N> FrameLayer for MsgIdLayer<F, S, A, N>
where
    F: ValueField<Value = S::Id>,
    S: MessageSet,
    S::Id: WireInt,
    A: MsgAllocator<S>,
    N: MsgLayer<S>,
{
    type Msg = S;
    type Handle = A::Ptr;

    fn min_frame_len(&self) -> usize {
        F::min_len() + self.next.min_len()
    }

    fn frame_len(&self, msg: &S) -> usize {
        let mut field = F::default();
        field.set(msg.id());
        field.len() + self.next.len_of(msg)
    }

    fn read(
        &self,
        cursor: &mut ReadCursor<'_>,
        mut trace: Option<&mut Trace>,
    ) -> Result<Decoded<A::Ptr>> {
        let available = cursor.remaining();
        let mut field = F::default();
        field
            .read(cursor)
            .map_err(|err| widen_missing(err, self.min_frame_len(), available))?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "id", &field);
        }

        let id = field.get();
        if S::from_id(id, 0).is_none() {
            debug!(id = id.to_raw(), "unknown message id");
            return Err(CodecError::InvalidMsgId { id: id.to_raw() });
        }

        let payload_start = cursor.position();
        let mut idx = 0;
        let mut last_err = CodecError::InvalidMsgId { id: id.to_raw() };
        while let Some(msg) = S::from_id(id, idx) {
            let mut handle = self.alloc.allocate(msg)?;
            cursor.set_position(payload_start);
            let attempt =
                self.next
                    .read_into(&mut *handle, cursor, trace.as_mut().map(|t| &mut **t));
            match attempt {
                Ok(()) => {
                    trace!(id = id.to_raw(), "message payload decoded");
                    return Ok(Decoded::Valid(handle));
                }
                // Framed but invalid: hand the message back anyway.
                Err(CodecError::InvalidData) => return Ok(Decoded::Invalid(handle)),
                Err(err) => last_err = err,
            }
            idx += 1;
        }
        Err(last_err)
    }

    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &S,
        out: &mut W,
        mut trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        let mut field = F::default();
        field.set(msg.id());
        let status = field.write(out)?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "id", &field);
        }
        Ok(status.merge(self.next.write_from(msg, out, trace)?))
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        let mut field = F::default();
        read_patch_field(&mut field, patch)?;
        self.next.update(patch)
    }
}
