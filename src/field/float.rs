//! IEEE-754 floating point fields.

use core::fmt;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::endian::ByteOrder;
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{Field, InvalidPolicy};

/// Float types a field value can be stored as.
pub trait WireFloat: Copy + PartialEq + fmt::Debug + Default + 'static {
    /// Serialized width in bytes.
    const WIDTH: usize;

    /// The IEEE-754 bit pattern, zero-extended to 64 bits.
    fn to_bits_raw(self) -> u64;

    /// Rebuild from a bit pattern.
    fn from_bits_raw(raw: u64) -> Self;
}

impl WireFloat for f32 {
    const WIDTH: usize = 4;

    fn to_bits_raw(self) -> u64 {
        u64::from(self.to_bits())
    }

    fn from_bits_raw(raw: u64) -> Self {
        f32::from_bits(raw as u32)
    }
}

impl WireFloat for f64 {
    const WIDTH: usize = 8;

    fn to_bits_raw(self) -> u64 {
        self.to_bits()
    }

    fn from_bits_raw(raw: u64) -> Self {
        f64::from_bits(raw)
    }
}

/// Compile-time options of a [`FloatField`].
pub trait FloatSpec: 'static {
    /// In-memory value type.
    type Value: WireFloat;
    /// Byte order of the encoding.
    type Order: ByteOrder;

    /// Reaction to a failed validity check during read.
    const ON_INVALID: InvalidPolicy = InvalidPolicy::Ignore;

    /// Value used for default construction.
    fn default_value() -> Self::Value {
        Self::Value::default()
    }

    /// Validity predicate.
    fn is_valid(_value: Self::Value) -> bool {
        true
    }
}

/// Floating point field parameterized by a [`FloatSpec`].
pub struct FloatField<S: FloatSpec> {
    value: S::Value,
}

impl<S: FloatSpec> FloatField<S> {
    /// Construct with an explicit value.
    #[must_use]
    pub fn new(value: S::Value) -> Self {
        Self { value }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> S::Value {
        self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: S::Value) {
        self.value = value;
    }
}

impl<S: FloatSpec> Default for FloatField<S> {
    fn default() -> Self {
        Self {
            value: S::default_value(),
        }
    }
}

impl<S: FloatSpec> Clone for FloatField<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: FloatSpec> Copy for FloatField<S> {}

impl<S: FloatSpec> PartialEq for FloatField<S> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<S: FloatSpec> fmt::Debug for FloatField<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FloatField").field(&self.value).finish()
    }
}

impl<S: FloatSpec> Field for FloatField<S> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let bytes = cursor.take(S::Value::WIDTH)?;
        self.value = S::Value::from_bits_raw(S::Order::get_uint(bytes));
        if S::ON_INVALID == InvalidPolicy::Fail && !self.valid() {
            return Err(CodecError::InvalidData);
        }
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let mut buf = [0u8; 8];
        S::Order::put_uint(&mut buf[..S::Value::WIDTH], self.value.to_bits_raw());
        out.put(&buf[..S::Value::WIDTH])?;
        Ok(WriteStatus::Complete)
    }

    fn len(&self) -> usize {
        S::Value::WIDTH
    }

    fn min_len() -> usize {
        S::Value::WIDTH
    }

    fn max_len() -> usize {
        S::Value::WIDTH
    }

    fn valid(&self) -> bool {
        S::is_valid(self.value)
    }
}
