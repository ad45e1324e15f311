//! The innermost layer: the message's own fields are the payload.

use crate::cursor::{PatchCursor, ReadCursor, WriteCursor};
use crate::error::{Result, WriteStatus};
use crate::message::Message;
use crate::stack::{MsgLayer, Trace};

/// Consumes the remaining bytes of the frame as the message payload:
/// fields are read and written in declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadLayer;

impl PayloadLayer {
    /// Construct the terminal layer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<M: Message> MsgLayer<M> for PayloadLayer {
    fn min_len(&self) -> usize {
        0
    }

    fn len_of(&self, msg: &M) -> usize {
        msg.len()
    }

    fn read_into(
        &self,
        msg: &mut M,
        cursor: &mut ReadCursor<'_>,
        _trace: Option<&mut Trace>,
    ) -> Result<()> {
        msg.read(cursor)
    }

    fn write_from<W: WriteCursor + ?Sized>(
        &self,
        msg: &M,
        out: &mut W,
        _trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        msg.write(out)
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        // Payload bytes are final as written.
        let end = patch.len();
        patch.set_position(end);
        Ok(())
    }
}
