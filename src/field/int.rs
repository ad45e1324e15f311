//! Integer fields.
//!
//! The workhorse of the catalogue: fixed-width or base-128
//! variable-length integers with optional serialization offset, scaling
//! ratio, default value, and validity range.

use core::fmt;
use core::marker::PhantomData;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::endian::{sign_extend, ByteOrder, WireInt};
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{Field, InvalidPolicy, ValueField};

/// Compile-time options of an [`IntField`].
///
/// Every item has a default, so a minimal spec names only the value
/// type and byte order. `WIRE_LEN` may be narrower than the value type
/// (a `u32` carried in 3 wire bytes); `VAR_LEN = Some((min, max))`
/// switches to base-128 continuation encoding bounded to that byte
/// range and makes `WIRE_LEN` irrelevant.
pub trait IntSpec: 'static {
    /// In-memory value type.
    type Value: WireInt;
    /// Byte order of the fixed-width encoding.
    type Order: ByteOrder;

    /// Serialized width in bytes (fixed-width encoding only).
    const WIRE_LEN: usize = core::mem::size_of::<Self::Value>();
    /// Base-128 variable-length bounds, when enabled.
    const VAR_LEN: Option<(usize, usize)> = None;
    /// Added before write, subtracted after read.
    const SER_OFFSET: i64 = 0;
    /// `(p, q)` such that logical value × p / q = wire integer.
    const SCALING: (i64, i64) = (1, 1);
    /// Reaction to a failed validity check during read.
    const ON_INVALID: InvalidPolicy = InvalidPolicy::Ignore;

    /// Value used for default construction.
    fn default_value() -> Self::Value {
        Self::Value::default()
    }

    /// Validity predicate; union of ranges expressible as any boolean.
    fn is_valid(_value: Self::Value) -> bool {
        true
    }

    /// Custom refresh hook; returns true iff the value changed.
    fn refresh_value(_value: &mut Self::Value) -> bool {
        false
    }
}

/// Minimal spec: a plain integer of its natural width.
pub struct Plain<T, E>(PhantomData<(T, E)>);

impl<T: WireInt, E: ByteOrder> IntSpec for Plain<T, E> {
    type Value = T;
    type Order = E;
}

/// Integer field parameterized by an [`IntSpec`].
pub struct IntField<S: IntSpec> {
    value: S::Value,
}

impl<S: IntSpec> IntField<S> {
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

    /// The value scaled into its logical domain by the spec's ratio.
    #[must_use]
    pub fn scaled(&self) -> f64 {
        let (p, q) = S::SCALING;
        (self.value.to_raw() as i64 as f64) * q as f64 / p as f64
    }

    /// Set the value from its logical domain, rounding to the nearest
    /// representable wire integer.
    pub fn set_scaled(&mut self, logical: f64) {
        let (p, q) = S::SCALING;
        let wire = (logical * p as f64 / q as f64).round() as i64;
        self.value = S::Value::from_raw(wire as u64);
    }
}

impl<S: IntSpec> Default for IntField<S> {
    fn default() -> Self {
        Self {
            value: S::default_value(),
        }
    }
}

impl<S: IntSpec> Clone for IntField<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: IntSpec> Copy for IntField<S> {}

impl<S: IntSpec> PartialEq for IntField<S> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<S: IntSpec> Eq for IntField<S> {}

impl<S: IntSpec> fmt::Debug for IntField<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntField").field(&self.value).finish()
    }
}

impl<S: IntSpec> Field for IntField<S> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let raw = match S::VAR_LEN {
            None => {
                let bytes = cursor.take(S::WIRE_LEN)?;
                let raw = S::Order::get_uint(bytes);
                if S::Value::SIGNED {
                    sign_extend(raw, S::WIRE_LEN)
                } else {
                    raw
                }
            }
            Some((_, max)) => read_varint(cursor, max)?,
        };
        self.value = S::Value::from_raw(raw.wrapping_sub(S::SER_OFFSET as u64));
        if S::ON_INVALID == InvalidPolicy::Fail && !self.valid() {
            return Err(CodecError::InvalidData);
        }
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let raw = self.value.to_raw().wrapping_add(S::SER_OFFSET as u64);
        match S::VAR_LEN {
            None => {
                let mut buf = [0u8; 8];
                S::Order::put_uint(&mut buf[..S::WIRE_LEN], raw);
                out.put(&buf[..S::WIRE_LEN])?;
            }
            Some((min, max)) => write_varint(out, raw, min, max)?,
        }
        Ok(WriteStatus::Complete)
    }

    fn len(&self) -> usize {
        match S::VAR_LEN {
            None => S::WIRE_LEN,
            Some((min, _)) => {
                let raw = self.value.to_raw().wrapping_add(S::SER_OFFSET as u64);
                varint_byte_len(raw, min)
            }
        }
    }

    fn min_len() -> usize {
        match S::VAR_LEN {
            None => S::WIRE_LEN,
            Some((min, _)) => min,
        }
    }

    fn max_len() -> usize {
        match S::VAR_LEN {
            None => S::WIRE_LEN,
            Some((_, max)) => max,
        }
    }

    fn valid(&self) -> bool {
        S::is_valid(self.value)
    }

    fn refresh(&mut self) -> bool {
        S::refresh_value(&mut self.value)
    }
}

impl<S: IntSpec> ValueField for IntField<S> {
    type Value = S::Value;

    fn get(&self) -> S::Value {
        self.value
    }

    fn set(&mut self, value: S::Value) {
        self.value = value;
    }
}

/// Serialized byte count of `raw` in base-128, at least `min`.
fn varint_byte_len(raw: u64, min: usize) -> usize {
    let mut n = 1;
    let mut v = raw >> 7;
    while v != 0 {
        n += 1;
        v >>= 7;
    }
    n.max(min)
}

/// Base-128 with continuation bit, least significant group first.
fn write_varint<W: WriteCursor + ?Sized>(
    out: &mut W,
    raw: u64,
    min: usize,
    max: usize,
) -> Result<()> {
    let total = varint_byte_len(raw, min);
    if total > max {
        return Err(CodecError::ProtocolError);
    }
    let mut v = raw;
    for i in 0..total {
        let mut byte = (v & 0x7F) as u8;
        v >>= 7;
        if i + 1 < total {
            byte |= 0x80;
        }
        out.put_byte(byte)?;
    }
    Ok(())
}

fn read_varint(cursor: &mut ReadCursor<'_>, max: usize) -> Result<u64> {
    let mut raw = 0u64;
    for i in 0..max {
        let byte = cursor.take_byte()?;
        let shift = 7 * i as u32;
        if shift < 64 {
            raw |= u64::from(byte & 0x7F) << shift;
        }
        if byte & 0x80 == 0 {
            return Ok(raw);
        }
    }
    // Continuation bit still set past the declared maximum width.
    Err(CodecError::ProtocolError)
}
