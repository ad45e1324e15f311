//! Size-prefix layer: a field carrying the exact byte length of the
//! inner frame.

use core::marker::PhantomData;

use tracing::trace;

use crate::cursor::{PatchCursor, ReadCursor, WriteCursor};
use crate::endian::WireInt;
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{ensure_capacity, Field, ValueField};
use crate::stack::{
    read_patch_field, record_field, widen_missing, Decoded, FrameLayer, Trace,
};

/// Protocol layer that prefixes the inner frame with its byte length.
///
/// On read, a declared size larger than the remaining buffer is
/// `NotEnoughData` with `missing = declared − remaining`; the inner
/// read is clamped to the declared window, and an inner read that wants
/// bytes beyond it is a protocol error. The size of a well-formed frame
/// is authoritative: after a successful inner read the cursor lands at
/// the window end.
pub struct MsgSizeLayer<F, N> {
    next: N,
    _marker: PhantomData<F>,
}

impl<F, N> MsgSizeLayer<F, N> {
    /// Compose over the inner layer.
    pub fn new(next: N) -> Self {
        Self {
            next,
            _marker: PhantomData,
        }
    }
}

impl<F, N> FrameLayer for MsgSizeLayer<F, N>
where
    F: ValueField,
    F::Value: WireInt,
    N: FrameLayer,
{
    type Msg = N::Msg;
    type Handle = N::Handle;

    fn min_frame_len(&self) -> usize {
        F::min_len() + self.next.min_frame_len()
    }

    fn frame_len(&self, msg: &Self::Msg) -> usize {
        let inner = self.next.frame_len(msg);
        let mut field = F::default();
        field.set(F::Value::from_raw(inner as u64));
        field.len() + inner
    }

    fn read(
        &self,
        cursor: &mut ReadCursor<'_>,
        mut trace: Option<&mut Trace>,
    ) -> Result<Decoded<Self::Handle>> {
        let available = cursor.remaining();
        let mut field = F::default();
        field
            .read(cursor)
            .map_err(|err| widen_missing(err, self.min_frame_len(), available))?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "size", &field);
        }

        let declared = field.get().to_raw() as usize;
        if cursor.remaining() < declared {
            return Err(CodecError::NotEnoughData {
                missing: declared - cursor.remaining(),
            });
        }

        let end = cursor.position() + declared;
        let mut window = cursor.window(declared);
        match self.next.read(&mut window, trace) {
            Ok(decoded) => {
                trace!(declared, "sized frame decoded");
                cursor.set_position(end);
                Ok(decoded)
            }
            // The declared window must hold the whole inner frame.
            Err(CodecError::NotEnoughData { .. }) => {
                cursor.set_position(window.position());
                Err(CodecError::ProtocolError)
            }
            Err(err) => {
                cursor.set_position(window.position());
                Err(err)
            }
        }
    }

    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &Self::Msg,
        out: &mut W,
        mut trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        let inner = self.next.frame_len(msg);
        if F::min_len() == F::max_len() {
            ensure_capacity(inner as u64, F::max_len())?;
        }
        let mut field = F::default();
        field.set(F::Value::from_raw(inner as u64));
        let status = field.write(out)?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "size", &field);
        }
        Ok(status.merge(self.next.write(msg, out, trace)?))
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        let mut field = F::default();
        read_patch_field(&mut field, patch)?;
        let declared = field.get().to_raw() as usize;
        let end = patch.position() + declared;
        {
            let mut window = patch.window(declared);
            self.next.update(&mut window)?;
        }
        patch.set_position(end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::HeapAlloc;
    use crate::cursor::VecWriter;
    use crate::endian::BigEndian;
    use crate::field::{IntField, Plain};
    use crate::message::Message as _;
    use crate::stack::{MsgIdLayer, PayloadLayer};

    type U8 = IntField<Plain<u8, BigEndian>>;
    type U16 = IntField<Plain<u16, BigEndian>>;

    crate::message_set! {
        /// Messages for the size-layer tests.
        pub enum SizeMsg: u8 {
            0x07 => Value((U16,)) via on_value,
        }
        /// Unused handler.
        pub trait SizeHandler;
    }

    type Stack = MsgSizeLayer<U8, MsgIdLayer<U8, SizeMsg, HeapAlloc, PayloadLayer>>;

    fn stack() -> Stack {
        MsgSizeLayer::new(MsgIdLayer::new(HeapAlloc, PayloadLayer::new()))
    }

    #[test]
    fn roundtrip() {
        let layer = stack();
        let msg = SizeMsg::Value((U16::new(0x0102),));

        let mut wire = Vec::new();
        let status = layer
            .write(&msg, &mut VecWriter::new(&mut wire), None)
            .unwrap();
        assert_eq!(status, WriteStatus::Complete);
        assert_eq!(wire, vec![0x03, 0x07, 0x01, 0x02]);
        assert_eq!(layer.frame_len(&msg), wire.len());

        let mut cursor = ReadCursor::new(&wire);
        let decoded = layer.read(&mut cursor, None).unwrap();
        assert_eq!(decoded.into_inner().id(), 0x07);
        assert!(cursor.at_end());
    }

    #[test]
    fn truncated_frame_reports_missing() {
        let layer = stack();
        // Declared 3 inner bytes, only 2 present.
        let wire = [0x03, 0x07, 0x01];
        let mut cursor = ReadCursor::new(&wire);
        assert_eq!(
            layer.read(&mut cursor, None).err(),
            Some(CodecError::NotEnoughData { missing: 1 })
        );
    }

    #[test]
    fn lying_size_is_a_protocol_error() {
        let layer = stack();
        // Declared 2 inner bytes cannot hold id + u16 payload.
        let wire = [0x02, 0x07, 0x01, 0x02];
        let mut cursor = ReadCursor::new(&wire);
        assert_eq!(
            layer.read(&mut cursor, None).err(),
            Some(CodecError::ProtocolError)
        );
    }

    #[test]
    fn empty_buffer_counts_whole_stack() {
        let layer = stack();
        let mut cursor = ReadCursor::new(&[]);
        let err = layer.read(&mut cursor, None).err().unwrap();
        // Size byte + id byte; payload length is unknown until the
        // message type is resolved.
        assert_eq!(err, CodecError::NotEnoughData { missing: 2 });
    }
}
