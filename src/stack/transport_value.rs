//! Transport-value layer: mirrors a transport field into a message
//! attribute without changing the frame layout.
//!
//! Used when a transport field (a protocol version, a routing flag)
//! also affects how the payload is interpreted by the application.

use core::marker::PhantomData;

use crate::cursor::{PatchCursor, ReadCursor, WriteCursor};
use crate::error::{Result, WriteStatus};
use crate::field::Field;
use crate::stack::{
    read_patch_field, record_field, widen_missing, Decoded, FrameLayer, Trace,
};

/// Moves a transport field's value in and out of the message.
pub trait TransportBinder<F: Field, M>: 'static {
    /// Apply the decoded field to the message after a read.
    fn store(field: &F, msg: &mut M);

    /// Build the field from the message for a write.
    fn load(msg: &M) -> F;
}

/// Protocol layer owning a transport field whose value lives on the
/// message rather than in the frame structure.
pub struct TransportValueLayer<F, B, N> {
    next: N,
    _marker: PhantomData<(F, B)>,
}

impl<F, B, N> TransportValueLayer<F, B, N> {
    /// Compose over the inner layer.
    pub fn new(next: N) -> Self {
        Self {
            next,
            _marker: PhantomData,
        }
    }
}

impl<F, B, N> FrameLayer for TransportValueLayer<F, B, N>
where
    F: Field,
    N: FrameLayer,
    B: TransportBinder<F, N::Msg>,
{
    type Msg = N::Msg;
    type Handle = N::Handle;

    fn min_frame_len(&self) -> usize {
        F::min_len() + self.next.min_frame_len()
    }

    fn frame_len(&self, msg: &Self::Msg) -> usize {
        B::load(msg).len() + self.next.frame_len(msg)
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
            record_field(t, "transport-value", &field);
        }

        match self.next.read(cursor, trace)? {
            Decoded::Valid(mut handle) => {
                B::store(&field, &mut *handle);
                Ok(Decoded::Valid(handle))
            }
            Decoded::Invalid(mut handle) => {
                B::store(&field, &mut *handle);
                Ok(Decoded::Invalid(handle))
            }
        }
    }

    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &Self::Msg,
        out: &mut W,
        mut trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        let field = B::load(msg);
        let status = field.write(out)?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "transport-value", &field);
        }
        Ok(status.merge(self.next.write(msg, out, trace)?))
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        let mut field = F::default();
        read_patch_field(&mut field, patch)?;
        self.next.update(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::HeapAlloc;
    use crate::cursor::VecWriter;
    use crate::endian::BigEndian;
    use crate::field::{IntField, Plain, Unserialized, ValueField};
    use crate::stack::{MsgIdLayer, PayloadLayer};

    type U8 = IntField<Plain<u8, BigEndian>>;

    // The version rides in the transport wrapper; the message keeps it
    // in an unserialized attribute field.
    type Body = (U8, Unserialized<U8>);

    crate::message_set! {
        /// Messages for the transport-value tests.
        pub enum TvMsg: u8 {
            0x01 => Data(Body) via on_data,
        }
        /// Unused handler.
        pub trait TvHandler;
    }

    struct VersionBinder;

    impl TransportBinder<U8, TvMsg> for VersionBinder {
        fn store(field: &U8, msg: &mut TvMsg) {
            let TvMsg::Data((_, version)) = msg;
            version.field_mut().set(field.get());
        }

        fn load(msg: &TvMsg) -> U8 {
            let TvMsg::Data((_, version)) = msg;
            U8::new(version.field().value())
        }
    }

    type Stack =
        TransportValueLayer<U8, VersionBinder, MsgIdLayer<U8, TvMsg, HeapAlloc, PayloadLayer>>;

    fn stack() -> Stack {
        TransportValueLayer::new(MsgIdLayer::new(HeapAlloc, PayloadLayer::new()))
    }

    #[test]
    fn read_mirrors_the_value_into_the_message() {
        let layer = stack();
        // version=3, id=1, payload byte 0x42
        let wire = [0x03, 0x01, 0x42];
        let decoded = layer.read(&mut ReadCursor::new(&wire), None).unwrap();
        let msg = decoded.into_inner();
        let TvMsg::Data((byte, version)) = &*msg;
        assert_eq!(byte.value(), 0x42);
        assert_eq!(version.field().value(), 3);
    }

    #[test]
    fn write_takes_the_value_from_the_message() {
        let layer = stack();
        let mut version = Unserialized::<U8>::default();
        version.field_mut().set_value(7);
        let msg = TvMsg::Data((U8::new(0x42), version));

        let mut wire = Vec::new();
        let _ = layer
            .write(&msg, &mut VecWriter::new(&mut wire), None)
            .unwrap();
        assert_eq!(wire, vec![0x07, 0x01, 0x42]);
        assert_eq!(layer.frame_len(&msg), 3);
    }
}
