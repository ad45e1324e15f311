//! Enumeration fields.
//!
//! Stored as the raw underlying integer so that unknown wire values are
//! preserved for inspection; `value()` yields the typed enum only when
//! the raw value names a known member.

use core::fmt;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::endian::{sign_extend, ByteOrder, WireInt};
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{Field, InvalidPolicy, ValueField};

/// Compile-time options of an [`EnumField`].
pub trait EnumSpec: 'static {
    /// The enum type exposed to the application.
    type Enum: Copy + PartialEq + fmt::Debug;
    /// Underlying wire integer.
    type Repr: WireInt;
    /// Byte order of the encoding.
    type Order: ByteOrder;

    /// Serialized width in bytes.
    const WIRE_LEN: usize = core::mem::size_of::<Self::Repr>();
    /// Reaction to an unknown wire value during read.
    const ON_INVALID: InvalidPolicy = InvalidPolicy::Ignore;

    /// Value used for default construction.
    fn default_value() -> Self::Enum;

    /// Map a member to its wire integer.
    fn to_repr(value: Self::Enum) -> Self::Repr;

    /// Map a wire integer back to a member, `None` when unknown.
    fn from_repr(repr: Self::Repr) -> Option<Self::Enum>;
}

/// Enumeration field parameterized by an [`EnumSpec`].
pub struct EnumField<S: EnumSpec> {
    raw: S::Repr,
}

impl<S: EnumSpec> EnumField<S> {
    /// Construct holding a known member.
    #[must_use]
    pub fn new(value: S::Enum) -> Self {
        Self {
            raw: S::to_repr(value),
        }
    }

    /// The decoded member, `None` if the raw value is unknown.
    #[must_use]
    pub fn value(&self) -> Option<S::Enum> {
        S::from_repr(self.raw)
    }

    /// Set a known member.
    pub fn set_value(&mut self, value: S::Enum) {
        self.raw = S::to_repr(value);
    }

    /// The raw wire integer, whatever it was.
    #[must_use]
    pub fn raw(&self) -> S::Repr {
        self.raw
    }
}

impl<S: EnumSpec> Default for EnumField<S> {
    fn default() -> Self {
        Self::new(S::default_value())
    }
}

impl<S: EnumSpec> Clone for EnumField<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: EnumSpec> Copy for EnumField<S> {}

impl<S: EnumSpec> PartialEq for EnumField<S> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<S: EnumSpec> Eq for EnumField<S> {}

impl<S: EnumSpec> fmt::Debug for EnumField<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => f.debug_tuple("EnumField").field(&value).finish(),
            None => f.debug_tuple("EnumField").field(&self.raw).finish(),
        }
    }
}

impl<S: EnumSpec> Field for EnumField<S> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let bytes = cursor.take(S::WIRE_LEN)?;
        let mut raw = S::Order::get_uint(bytes);
        if S::Repr::SIGNED {
            raw = sign_extend(raw, S::WIRE_LEN);
        }
        self.raw = S::Repr::from_raw(raw);
        if S::ON_INVALID == InvalidPolicy::Fail && !self.valid() {
            return Err(CodecError::InvalidData);
        }
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let mut buf = [0u8; 8];
        S::Order::put_uint(&mut buf[..S::WIRE_LEN], self.raw.to_raw());
        out.put(&buf[..S::WIRE_LEN])?;
        Ok(WriteStatus::Complete)
    }

    fn len(&self) -> usize {
        S::WIRE_LEN
    }

    fn min_len() -> usize {
        S::WIRE_LEN
    }

    fn max_len() -> usize {
        S::WIRE_LEN
    }

    fn valid(&self) -> bool {
        self.value().is_some()
    }
}

impl<S: EnumSpec> ValueField for EnumField<S> {
    type Value = S::Repr;

    fn get(&self) -> S::Repr {
        self.raw
    }

    fn set(&mut self, value: S::Repr) {
        self.raw = value;
    }
}
