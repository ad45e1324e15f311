//! The protocol stack: an ordered chain of transport layers.
//!
//! Layers compose as a cons-chain terminated by the payload layer. The
//! ID layer is the pivot: layers outside it implement [`FrameLayer`]
//! (no message exists yet; a successful read produces one), layers
//! inside it implement [`MsgLayer`] (they operate on the allocated
//! message). The outermost layer is the last one composed, and the
//! declared composition order is part of the wire contract.

pub mod checksum;
pub mod id;
pub mod payload;
pub mod size;
pub mod sync;
pub mod transport_value;

pub use checksum::{BasicSum, Checksum, ChecksumLayer, ChecksumPrefixLayer, Crc16Ccitt, Xxh3};
pub use id::MsgIdLayer;
pub use payload::PayloadLayer;
pub use size::MsgSizeLayer;
pub use sync::SyncPrefixLayer;
pub use transport_value::{TransportBinder, TransportValueLayer};

use std::ops::{Deref, DerefMut};

use crate::cursor::{PatchCursor, ReadCursor, VecWriter, WriteCursor};
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::Field;
use crate::message::Message;

/// A transport field observed on the wire at one layer, captured by the
/// traced read/write variants for introspection tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTrace {
    /// Which layer produced the field.
    pub layer: &'static str,
    /// Its exact wire bytes.
    pub bytes: Vec<u8>,
}

/// Ordered capture of every transport field in a stack operation.
pub type Trace = Vec<FieldTrace>;

/// Outcome of a successful frame read.
///
/// An `Invalid` message was framed correctly but failed a validity
/// check; it is still handed back so the caller can inspect it.
#[derive(Debug)]
pub enum Decoded<P> {
    /// The message decoded cleanly.
    Valid(P),
    /// The message is framed but invalid.
    Invalid(P),
}

impl<P> Decoded<P> {
    /// Whether the frame decoded cleanly.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Decoded::Valid(_))
    }

    /// The message, valid or not.
    #[must_use]
    pub fn into_inner(self) -> P {
        match self {
            Decoded::Valid(msg) | Decoded::Invalid(msg) => msg,
        }
    }
}

/// A layer outside the ID pivot: reading produces a message.
pub trait FrameLayer {
    /// The message-set type this stack decodes to.
    type Msg: Message;
    /// Handle produced by the stack's allocator.
    type Handle: Deref<Target = Self::Msg> + DerefMut;

    /// Minimum bytes any frame of this stack occupies.
    fn min_frame_len(&self) -> usize;

    /// Exact frame length `msg` would occupy when written.
    fn frame_len(&self, msg: &Self::Msg) -> usize;

    /// Decode one frame.
    ///
    /// On failure the cursor position pinpoints the byte where the
    /// decision was made; `NotEnoughData` carries the minimum number of
    /// additional bytes required to make progress.
    fn read(
        &self,
        cursor: &mut ReadCursor<'_>,
        trace: Option<&mut Trace>,
    ) -> Result<Decoded<Self::Handle>>;

    /// Encode one frame.
    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &Self::Msg,
        out: &mut W,
        trace: Option<&mut Trace>,
    ) -> Result<WriteStatus>;

    /// Finalize deferred transport fields over an already-written
    /// frame; required after a write reported `UpdateRequired`.
    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()>;
}

/// A layer inside the ID pivot: it operates on the allocated message.
pub trait MsgLayer<M: Message> {
    /// Minimum bytes this part of the frame occupies.
    fn min_len(&self) -> usize;

    /// Exact length of this part for `msg`.
    fn len_of(&self, msg: &M) -> usize;

    /// Decode into the message.
    fn read_into(
        &self,
        msg: &mut M,
        cursor: &mut ReadCursor<'_>,
        trace: Option<&mut Trace>,
    ) -> Result<()>;

    /// Encode from the message.
    fn write_from<W: WriteCursor + ?Sized>(
        &self,
        msg: &M,
        out: &mut W,
        trace: Option<&mut Trace>,
    ) -> Result<WriteStatus>;

    /// Finalize deferred fields over the written region.
    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()>;
}

/// Record a transport field's wire bytes into a trace.
pub(crate) fn record_field<F: Field>(trace: &mut Trace, layer: &'static str, field: &F) {
    let mut bytes = Vec::with_capacity(field.len());
    let mut writer = VecWriter::new(&mut bytes);
    if field.write(&mut writer).is_ok() {
        trace.push(FieldTrace { layer, bytes });
    }
}

/// Re-read a transport field from the written region during an update
/// pass, advancing the patch cursor past it.
pub(crate) fn read_patch_field<F: Field>(
    field: &mut F,
    patch: &mut PatchCursor<'_>,
) -> Result<()> {
    let pos = {
        let mut cursor = ReadCursor::new(patch.as_slice());
        cursor.set_position(patch.position());
        field.read(&mut cursor)?;
        cursor.position()
    };
    patch.set_position(pos);
    Ok(())
}

/// Widen a field-level `NotEnoughData` to account for the minimum
/// length of everything the stack still has to read.
pub(crate) fn widen_missing(err: CodecError, min_total: usize, available: usize) -> CodecError {
    match err {
        CodecError::NotEnoughData { missing } => CodecError::NotEnoughData {
            missing: missing.max(min_total.saturating_sub(available)).max(1),
        },
        other => other,
    }
}
