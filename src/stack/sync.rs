//! Sync-prefix layer: a constant pattern marking the start of a frame.

use core::marker::PhantomData;

use tracing::debug;

use crate::cursor::{PatchCursor, ReadCursor, WriteCursor};
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::Field;
use crate::stack::{
    read_patch_field, record_field, widen_missing, Decoded, FrameLayer, Trace,
};

/// Protocol layer that expects its default-valued field as a prefix of
/// every frame.
///
/// The field type declares the sync pattern through its default value.
/// A prefix that decodes but does not match is a protocol error, which
/// framing callers answer by advancing one byte and retrying.
pub struct SyncPrefixLayer<F, N> {
    next: N,
    _marker: PhantomData<F>,
}

impl<F, N> SyncPrefixLayer<F, N> {
    /// Compose over the inner layer.
    pub fn new(next: N) -> Self {
        Self {
            next,
            _marker: PhantomData,
        }
    }
}

impl<F, N> FrameLayer for SyncPrefixLayer<F, N>
where
    F: Field + PartialEq,
    N: FrameLayer,
{
    type Msg = N::Msg;
    type Handle = N::Handle;

    fn min_frame_len(&self) -> usize {
        F::min_len() + self.next.min_frame_len()
    }

    fn frame_len(&self, msg: &Self::Msg) -> usize {
        F::default().len() + self.next.frame_len(msg)
    }

    fn read(
        &self,
        cursor: &mut ReadCursor<'_>,
        mut trace: Option<&mut Trace>,
    ) -> Result<Decoded<Self::Handle>> {
        let available = cursor.remaining();
        let start = cursor.position();
        let mut field = F::default();
        field
            .read(cursor)
            .map_err(|err| widen_missing(err, self.min_frame_len(), available))?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "sync", &field);
        }

        if field != F::default() {
            debug!(pos = start, "sync prefix mismatch");
            return Err(CodecError::ProtocolError);
        }

        self.next.read(cursor, trace)
    }

    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &Self::Msg,
        out: &mut W,
        mut trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        let field = F::default();
        let status = field.write(out)?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "sync", &field);
        }
        Ok(status.merge(self.next.write(msg, out, trace)?))
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        let mut field = F::default();
        read_patch_field(&mut field, patch)?;
        self.next.update(patch)
    }
}
