//! The field catalogue: self-describing wire values.
//!
//! A field owns its decoded value and knows its wire form. Per-field
//! options (endianness, wire width, serialization offset, validity
//! predicate, …) live on a zero-sized *spec* type implementing the
//! field kind's options trait, so a declared field costs exactly its
//! value and every option is resolved at compile time. Mutually
//! exclusive options are distinct types rather than detected conflicts:
//! a sequence picks one termination discipline by picking one type.

mod bits;
mod bundle;
mod enumeration;
mod float;
mod int;
mod optional;
mod seq;
mod special;
mod string;
mod variant;

pub use bits::{BitsField, BitsInt, BitsMember, BitsMembers};
pub use enumeration::{EnumField, EnumSpec};
pub use float::{FloatField, FloatSpec, WireFloat};
pub use int::{IntField, IntSpec, Plain};
pub use optional::{OptMode, OptionalField};
pub use seq::{
    BytesPrefixed, CountPrefixed, FixedCount, Open, SeqField, Terminated, Trailing,
};
pub use special::{NoValueField, Unserialized};
pub use string::StrField;
pub use variant::{Variant2, Variant3, Variant4};

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{CodecError, Result, WriteStatus};

/// How a field reacts to failing its validity predicate during read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPolicy {
    /// Validity never causes a read failure; `valid()` reports it.
    Ignore,
    /// `read` fails with [`CodecError::InvalidData`] on an invalid value.
    Fail,
}

/// A self-describing wire value.
///
/// Invariants every implementation upholds:
/// - `min_len() <= len() <= max_len()` for all reachable states;
/// - a successful `read` advances the cursor by exactly the bytes
///   consumed, and on failure the cursor position pinpoints the error;
/// - after a `Complete` write the sink has advanced by exactly `len()`.
pub trait Field: Default {
    /// Decode the value in place.
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()>;

    /// Encode the value.
    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus>;

    /// Serialized length of the current value, in bytes.
    fn len(&self) -> usize;

    /// Smallest possible serialized length for this field type.
    fn min_len() -> usize
    where
        Self: Sized;

    /// Largest possible serialized length for this field type.
    fn max_len() -> usize
    where
        Self: Sized;

    /// Whether the current value satisfies the field's invariants.
    fn valid(&self) -> bool {
        true
    }

    /// Re-derive dependent state; returns true iff anything changed.
    fn refresh(&mut self) -> bool {
        false
    }
}

/// Fields exposing a plain copyable value, used where a transport layer
/// needs to get or inject one (message IDs, sizes, checksums).
pub trait ValueField: Field {
    /// The exposed value type.
    type Value: Copy;

    /// Current value.
    fn get(&self) -> Self::Value;

    /// Replace the value.
    fn set(&mut self, value: Self::Value);
}

/// Reject values a fixed-width prefix or size field cannot represent.
pub(crate) fn ensure_capacity(value: u64, wire_bytes: usize) -> Result<()> {
    if wire_bytes >= 8 {
        return Ok(());
    }
    let cap = (1u64 << (8 * wire_bytes as u32)) - 1;
    if value > cap {
        return Err(CodecError::BufferOverflow {
            needed: value as usize,
            got: cap as usize,
        });
    }
    Ok(())
}
