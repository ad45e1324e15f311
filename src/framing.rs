//! Framed-stream recovery: turn an arbitrary byte stream into frames.
//!
//! The [`FrameBuffer`] accumulates incoming bytes and repeatedly runs
//! the stack over them. On `NotEnoughData` it stops and preserves the
//! tail for the next push; on a protocol error or unknown ID it
//! advances one byte and retries, collecting the skipped bytes as
//! garbage until the next successful frame. The codec guarantees the
//! cursor pinpoints the failing byte, which is what makes the one-byte
//! resynchronization policy sound.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::cursor::ReadCursor;
use crate::error::CodecError;
use crate::metrics;
use crate::stack::{Decoded, FrameLayer};

/// One outcome of polling a [`FrameBuffer`].
#[derive(Debug)]
pub enum FrameEvent<H> {
    /// A frame decoded cleanly.
    Frame(H),
    /// A frame was delimited correctly but its contents are invalid;
    /// the message is handed over for inspection.
    InvalidFrame(H),
    /// Bytes that could not be resynchronized into any frame.
    Garbage(Bytes),
    /// A non-recoverable error; polling stopped and the buffer was
    /// left untouched past the already-consumed frames.
    Error(CodecError),
}

/// Accumulating frame decoder over a protocol stack.
#[derive(Debug)]
pub struct FrameBuffer<L> {
    stack: L,
    buf: BytesMut,
}

impl<L: FrameLayer> FrameBuffer<L> {
    /// Wrap a stack with an empty buffer.
    pub fn new(stack: L) -> Self {
        Self {
            stack,
            buf: BytesMut::new(),
        }
    }

    /// The wrapped stack.
    pub fn stack(&self) -> &L {
        &self.stack
    }

    /// Bytes buffered and not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decode as many frames as the buffered bytes allow.
    pub fn poll(&mut self) -> Vec<FrameEvent<L::Handle>> {
        let mut events = Vec::new();
        let mut pos = 0usize;
        let mut garbage_start: Option<usize> = None;

        while pos < self.buf.len() {
            let mut cursor = ReadCursor::new(&self.buf);
            cursor.set_position(pos);

            match self.stack.read(&mut cursor, None) {
                Ok(decoded) => {
                    flush_garbage(&mut events, &self.buf, &mut garbage_start, pos);
                    let end = cursor.position();
                    match decoded {
                        Decoded::Valid(handle) => {
                            metrics::record_frame();
                            trace!(len = end - pos, "frame decoded");
                            events.push(FrameEvent::Frame(handle));
                        }
                        Decoded::Invalid(handle) => {
                            metrics::record_frame();
                            metrics::record_invalid_frame();
                            debug!(len = end - pos, "invalid frame kept");
                            events.push(FrameEvent::InvalidFrame(handle));
                        }
                    }
                    pos = end;
                }
                Err(CodecError::NotEnoughData { missing }) => {
                    trace!(missing, "awaiting more data");
                    break;
                }
                Err(CodecError::ProtocolError | CodecError::InvalidMsgId { .. }) => {
                    metrics::record_resync();
                    if garbage_start.is_none() {
                        debug!(pos, "resynchronizing byte by byte");
                        garbage_start = Some(pos);
                    }
                    pos += 1;
                }
                Err(err) => {
                    events.push(FrameEvent::Error(err));
                    break;
                }
            }
        }

        flush_garbage(&mut events, &self.buf, &mut garbage_start, pos);
        let _ = self.buf.split_to(pos);
        events
    }
}

fn flush_garbage<H>(
    events: &mut Vec<FrameEvent<H>>,
    buf: &BytesMut,
    start: &mut Option<usize>,
    end: usize,
) {
    if let Some(from) = start.take() {
        if end > from {
            metrics::record_garbage(end - from);
            events.push(FrameEvent::Garbage(Bytes::copy_from_slice(
                &buf[from..end],
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::HeapAlloc;
    use crate::cursor::VecWriter;
    use crate::endian::BigEndian;
    use crate::field::{IntField, IntSpec, Plain};
    use crate::message::Message as _;
    use crate::stack::{MsgIdLayer, MsgSizeLayer, PayloadLayer, SyncPrefixLayer};

    type U8 = IntField<Plain<u8, BigEndian>>;
    type U16 = IntField<Plain<u16, BigEndian>>;

    struct SyncAb;
    impl IntSpec for SyncAb {
        type Value = u8;
        type Order = BigEndian;
        fn default_value() -> u8 {
            0xAB
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Empty;
    impl crate::field::Field for Empty {
        fn read(&mut self, _cursor: &mut ReadCursor<'_>) -> crate::error::Result<()> {
            Ok(())
        }
        fn write<W: crate::cursor::WriteCursor + ?Sized>(
            &self,
            _out: &mut W,
        ) -> crate::error::Result<crate::error::WriteStatus> {
            Ok(crate::error::WriteStatus::Complete)
        }
        fn len(&self) -> usize {
            0
        }
        fn min_len() -> usize {
            0
        }
        fn max_len() -> usize {
            0
        }
    }

    crate::message_set! {
        /// Framing test messages.
        pub enum FrMsg: u8 {
            0x01 => Ping(Empty) via on_ping,
            0x02 => Value((U16,)) via on_value,
        }
        /// Unused handler.
        pub trait FrHandler;
    }

    type Stack =
        SyncPrefixLayer<IntField<SyncAb>, MsgSizeLayer<U8, MsgIdLayer<U8, FrMsg, HeapAlloc, PayloadLayer>>>;

    fn stack() -> Stack {
        SyncPrefixLayer::new(MsgSizeLayer::new(MsgIdLayer::new(
            HeapAlloc,
            PayloadLayer::new(),
        )))
    }

    fn frame_of(msg: &FrMsg) -> Vec<u8> {
        let mut wire = Vec::new();
        let _ = stack()
            .write(msg, &mut VecWriter::new(&mut wire), None)
            .unwrap();
        wire
    }

    #[test]
    fn two_back_to_back_frames() {
        let mut buffer = FrameBuffer::new(stack());
        buffer.push(&frame_of(&FrMsg::Value((U16::new(5),))));
        buffer.push(&frame_of(&FrMsg::Ping(Empty)));

        let events = buffer.poll();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], FrameEvent::Frame(m) if m.id() == 0x02));
        assert!(matches!(&events[1], FrameEvent::Frame(m) if m.id() == 0x01));
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut buffer = FrameBuffer::new(stack());
        let wire = frame_of(&FrMsg::Value((U16::new(9),)));
        buffer.push(&wire[..3]);
        assert!(buffer.poll().is_empty());
        assert_eq!(buffer.pending(), 3);

        buffer.push(&wire[3..]);
        let events = buffer.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], FrameEvent::Frame(_)));
    }

    #[test]
    fn garbage_between_frames_is_collected() {
        let mut buffer = FrameBuffer::new(stack());
        buffer.push(&frame_of(&FrMsg::Ping(Empty)));
        buffer.push(&[0x11, 0x22, 0x33]);
        buffer.push(&frame_of(&FrMsg::Value((U16::new(7),))));

        let events = buffer.poll();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], FrameEvent::Frame(_)));
        assert!(matches!(&events[1], FrameEvent::Garbage(g) if g.as_ref() == [0x11, 0x22, 0x33]));
        assert!(matches!(&events[2], FrameEvent::Frame(m) if m.id() == 0x02));
    }

    #[test]
    fn trailing_garbage_is_flushed() {
        let mut buffer = FrameBuffer::new(stack());
        // 0xAA never matches the sync byte and can never start a frame.
        buffer.push(&[0xAA, 0xAA]);
        let events = buffer.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], FrameEvent::Garbage(g) if g.as_ref() == [0xAA, 0xAA]));
        assert_eq!(buffer.pending(), 0);
    }
}
