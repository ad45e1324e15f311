//! wirestack - composable binary wire-protocol codec
//!
//! This library provides the building blocks for declaratively defined
//! binary protocols: a catalogue of self-describing fields, a message
//! interface with double dispatch over a closed message set, and a
//! protocol stack assembled from transport layers (sync prefix, size
//! prefix, checksum, message-ID dispatch, payload) with partial-read
//! recovery.
//!
//! # Quick Start
//!
//! ```rust
//! use wirestack::alloc::HeapAlloc;
//! use wirestack::cursor::{ReadCursor, VecWriter};
//! use wirestack::endian::BigEndian;
//! use wirestack::field::{IntField, Plain};
//! use wirestack::message::Message;
//! use wirestack::stack::{FrameLayer, MsgIdLayer, MsgSizeLayer, PayloadLayer};
//!
//! type U8 = IntField<Plain<u8, BigEndian>>;
//! type U16 = IntField<Plain<u16, BigEndian>>;
//!
//! wirestack::message_set! {
//!     /// The protocol's messages.
//!     pub enum Msg: u8 {
//!         0x01 => Reading((U16,)) via on_reading,
//!     }
//!     /// Visitor over [`Msg`].
//!     pub trait Handler;
//! }
//!
//! // Size(u8) | Id(u8) | payload
//! let stack = MsgSizeLayer::<U8, _>::new(MsgIdLayer::<U8, Msg, _, _>::new(
//!     HeapAlloc,
//!     PayloadLayer::new(),
//! ));
//!
//! let msg = Msg::Reading((U16::new(0x0102),));
//! let mut wire = Vec::new();
//! let _ = stack.write(&msg, &mut VecWriter::new(&mut wire), None)?;
//! assert_eq!(wire, vec![0x03, 0x01, 0x01, 0x02]);
//!
//! let decoded = stack.read(&mut ReadCursor::new(&wire), None)?;
//! assert_eq!(decoded.into_inner().id(), 0x01);
//! # Ok::<(), wirestack::error::CodecError>(())
//! ```
//!
//! # Design
//!
//! - **Fields** own their value and know their wire form; per-field
//!   options live on zero-sized spec types, resolved at compile time.
//! - **Messages** form a closed set expressed as a tagged enum with a
//!   generated visitor trait; dispatch needs no vtable.
//! - **Layers** compose generically, so `read` and `write` stay
//!   monomorphic and allocation-free on hot paths.
//! - **Errors are values** - every failure is a status; no panic
//!   crosses the API for malformed input.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::len_without_is_empty)]

pub mod alloc;
pub mod cursor;
pub mod endian;
pub mod error;
pub mod field;
pub mod framing;
pub mod message;
pub mod metrics;
pub mod stack;

pub use alloc::{HeapAlloc, MsgAllocator, SingleSlotAlloc};
pub use cursor::{PatchCursor, ReadCursor, SliceWriter, VecWriter, WriteCursor};
pub use endian::{BigEndian, ByteOrder, LittleEndian, WireInt};
pub use error::{CodecError, Result, WriteStatus};
pub use field::Field;
pub use framing::{FrameBuffer, FrameEvent};
pub use message::{Message, MessageSet};
pub use stack::{Decoded, FieldTrace, FrameLayer, MsgLayer, Trace};
