//! The message interface and double-dispatch machinery.
//!
//! A protocol's message set is a closed, statically known collection.
//! It is expressed as a tagged enum (one variant per concrete message)
//! generated by [`message_set!`], together with a visitor trait whose
//! per-message methods default to a required `fallback` — overriding a
//! subset yields selective handling without a vtable.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{Result, WriteStatus};

/// Polymorphic contract over messages.
///
/// For a message with fields `(f_1, …, f_k)`: `len` is the field sum,
/// `valid` the AND of field validity and the message's own contents
/// validator, and `refresh` reports whether any field changed.
pub trait Message {
    /// Wire type of the message ID.
    type Id: Copy + PartialEq + core::fmt::Debug;

    /// The message's constant ID.
    fn id(&self) -> Self::Id;

    /// Decode the payload fields in declaration order.
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()>;

    /// Encode the payload fields in declaration order.
    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus>;

    /// Serialized payload length in bytes.
    fn len(&self) -> usize;

    /// Whether every field (and the message itself) is valid.
    fn valid(&self) -> bool;

    /// Re-derive dependent field state; true iff anything changed.
    fn refresh(&mut self) -> bool;
}

/// A closed message set constructible from a wire ID.
///
/// `idx` selects among messages sharing an ID (rare; used for
/// polymorphic sub-variants) and is `0` for the common case.
pub trait MessageSet: Message + Sized {
    /// Allocate the default-valued message for `id`, or `None` when the
    /// ID (or index) is unknown.
    fn from_id(id: Self::Id, idx: usize) -> Option<Self>;
}

/// Define a message-set enum, its [`Message`]/[`MessageSet`] impls, a
/// handler trait, and double dispatch.
///
/// Each concrete message payload type must implement
/// [`Field`](crate::field::Field); its fields are the payload.
///
/// ```
/// use wirestack::endian::BigEndian;
/// use wirestack::field::{IntField, Plain};
///
/// type U16 = IntField<Plain<u16, BigEndian>>;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Ping;
/// # impl wirestack::field::Field for Ping {
/// #     fn read(&mut self, _: &mut wirestack::cursor::ReadCursor<'_>) -> wirestack::error::Result<()> { Ok(()) }
/// #     fn write<W: wirestack::cursor::WriteCursor + ?Sized>(&self, _: &mut W) -> wirestack::error::Result<wirestack::error::WriteStatus> { Ok(wirestack::error::WriteStatus::Complete) }
/// #     fn len(&self) -> usize { 0 }
/// #     fn min_len() -> usize { 0 }
/// #     fn max_len() -> usize { 0 }
/// # }
///
/// wirestack::message_set! {
///     /// Demo protocol messages.
///     pub enum DemoMsg: u8 {
///         0x01 => Ping(Ping) via on_ping,
///     }
///     /// Visitor over [`DemoMsg`].
///     pub trait DemoHandler;
/// }
///
/// struct Counter(u32);
/// impl DemoHandler for Counter {
///     type Out = ();
///     fn on_ping(&mut self, _msg: &mut Ping) {
///         self.0 += 1;
///     }
///     fn fallback(&mut self) {}
/// }
///
/// let mut msg = DemoMsg::Ping(Ping);
/// let mut counter = Counter(0);
/// msg.dispatch(&mut counter);
/// assert_eq!(counter.0, 1);
/// ```
#[macro_export]
macro_rules! message_set {
    (
        $(#[$enum_meta:meta])*
        $vis:vis enum $name:ident : $id_ty:ty {
            $( $id:literal => $variant:ident($payload:ty) via $method:ident ),+ $(,)?
        }
        $(#[$handler_meta:meta])*
        $hvis:vis trait $handler:ident;
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                #[doc = concat!("Message with wire ID `", stringify!($id), "`.")]
                $variant($payload),
            )+
        }

        impl $crate::message::Message for $name {
            type Id = $id_ty;

            fn id(&self) -> $id_ty {
                match self {
                    $( Self::$variant(_) => $id, )+
                }
            }

            fn read(
                &mut self,
                cursor: &mut $crate::cursor::ReadCursor<'_>,
            ) -> $crate::error::Result<()> {
                match self {
                    $( Self::$variant(payload) => $crate::field::Field::read(payload, cursor), )+
                }
            }

            fn write<W: $crate::cursor::WriteCursor + ?Sized>(
                &self,
                out: &mut W,
            ) -> $crate::error::Result<$crate::error::WriteStatus> {
                match self {
                    $( Self::$variant(payload) => $crate::field::Field::write(payload, out), )+
                }
            }

            fn len(&self) -> usize {
                match self {
                    $( Self::$variant(payload) => $crate::field::Field::len(payload), )+
                }
            }

            fn valid(&self) -> bool {
                match self {
                    $( Self::$variant(payload) => $crate::field::Field::valid(payload), )+
                }
            }

            fn refresh(&mut self) -> bool {
                match self {
                    $( Self::$variant(payload) => $crate::field::Field::refresh(payload), )+
                }
            }
        }

        impl $crate::message::MessageSet for $name {
            fn from_id(id: $id_ty, idx: usize) -> Option<Self> {
                if idx != 0 {
                    return None;
                }
                match id {
                    $( $id => Some(Self::$variant(<$payload as Default>::default())), )+
                    _ => None,
                }
            }
        }

        impl $name {
            /// Double dispatch: resolve the concrete message and hand it
            /// to the matching handler method.
            $vis fn dispatch<H: $handler>(&mut self, handler: &mut H) -> H::Out {
                match self {
                    $( Self::$variant(payload) => handler.$method(payload), )+
                }
            }
        }

        $(#[$handler_meta])*
        $hvis trait $handler {
            /// Return type shared by every handler method.
            type Out;

            $(
                /// Handle one concrete message type; defaults to
                /// [`Self::fallback`].
                fn $method(&mut self, msg: &mut $payload) -> Self::Out {
                    let _ = msg;
                    self.fallback()
                }
            )+

            /// Invoked for message types without a dedicated override.
            fn fallback(&mut self) -> Self::Out;
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::cursor::{ReadCursor, VecWriter};
    use crate::endian::BigEndian;
    use crate::field::{Field, IntField, Plain};
    use crate::message::{Message, MessageSet};

    type U16 = IntField<Plain<u16, BigEndian>>;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Ping;

    impl Field for Ping {
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

    type Status = (U16,);

    crate::message_set! {
        /// Test message set.
        pub enum TestMsg: u8 {
            0x01 => Ping(Ping) via on_ping,
            0x02 => Status(Status) via on_status,
        }
        /// Test handler.
        pub trait TestHandler;
    }

    #[test]
    fn factory_builds_by_id() {
        assert!(matches!(TestMsg::from_id(0x01, 0), Some(TestMsg::Ping(_))));
        assert!(matches!(
            TestMsg::from_id(0x02, 0),
            Some(TestMsg::Status(_))
        ));
        assert!(TestMsg::from_id(0x03, 0).is_none());
        assert!(TestMsg::from_id(0x01, 1).is_none());
    }

    #[test]
    fn ids_are_constant_per_variant() {
        assert_eq!(TestMsg::Ping(Ping).id(), 0x01);
        assert_eq!(TestMsg::Status(Status::default()).id(), 0x02);
    }

    #[test]
    fn payload_operations_delegate_to_fields() {
        let mut msg = TestMsg::from_id(0x02, 0).unwrap();
        let wire = [0x00, 0x2A];
        msg.read(&mut ReadCursor::new(&wire)).unwrap();
        assert_eq!(msg.len(), 2);
        assert!(msg.valid());

        let mut out = Vec::new();
        let _ = msg.write(&mut VecWriter::new(&mut out)).unwrap();
        assert_eq!(out, wire);
    }

    struct Selective {
        pings: u32,
        others: u32,
    }

    impl TestHandler for Selective {
        type Out = &'static str;

        fn on_ping(&mut self, _msg: &mut Ping) -> &'static str {
            self.pings += 1;
            "ping"
        }

        fn fallback(&mut self) -> &'static str {
            self.others += 1;
            "other"
        }
    }

    #[test]
    fn dispatch_is_selective_with_fallback() {
        let mut handler = Selective { pings: 0, others: 0 };

        let mut ping = TestMsg::Ping(Ping);
        assert_eq!(ping.dispatch(&mut handler), "ping");

        let mut status = TestMsg::Status(Status::default());
        assert_eq!(status.dispatch(&mut handler), "other");

        assert_eq!(handler.pings, 1);
        assert_eq!(handler.others, 1);
    }
}
