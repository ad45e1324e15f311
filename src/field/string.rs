//! String fields: the sequence disciplines applied to UTF-8 bytes.
//!
//! Wire bytes that are not valid UTF-8 fail the read with a protocol
//! error; protocols carrying arbitrary bytes should use a byte
//! sequence instead.

use core::fmt;
use core::marker::PhantomData;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::endian::WireInt;
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::seq::sentinel_bytes;
use crate::field::{
    ensure_capacity, BytesPrefixed, CountPrefixed, Field, FixedCount, Open, Terminated,
    ValueField,
};

/// UTF-8 string field under sequence discipline `D`.
pub struct StrField<D> {
    value: String,
    _discipline: PhantomData<D>,
}

impl<D> StrField<D> {
    /// Empty string.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: String::new(),
            _discipline: PhantomData,
        }
    }

    /// Construct from a value.
    #[must_use]
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _discipline: PhantomData,
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    fn decode_utf8(&mut self, bytes: &[u8]) -> Result<()> {
        match core::str::from_utf8(bytes) {
            Ok(text) => {
                self.value.clear();
                self.value.push_str(text);
                Ok(())
            }
            Err(_) => Err(CodecError::ProtocolError),
        }
    }
}

impl<D> Default for StrField<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for StrField<D> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _discipline: PhantomData,
        }
    }
}

impl<D> PartialEq for StrField<D> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<D> Eq for StrField<D> {}

impl<D> fmt::Debug for StrField<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrField").field(&self.value).finish()
    }
}

impl Field for StrField<Open> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let bytes = cursor.rest();
        cursor.advance(bytes.len())?;
        self.decode_utf8(bytes)
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        out.put(self.value.as_bytes())?;
        Ok(WriteStatus::Complete)
    }

    fn len(&self) -> usize {
        self.value.len()
    }

    fn min_len() -> usize {
        0
    }

    fn max_len() -> usize {
        usize::MAX
    }
}

macro_rules! impl_prefixed_str {
    ($discipline:ident) => {
        impl<F> Field for StrField<$discipline<F>>
        where
            F: ValueField,
            F::Value: WireInt,
        {
            fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
                let mut prefix = F::default();
                prefix.read(cursor)?;
                let byte_len = prefix.get().to_raw() as usize;
                let bytes = cursor.take(byte_len)?;
                self.decode_utf8(bytes)
            }

            fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
                let byte_len = self.value.len() as u64;
                if F::min_len() == F::max_len() {
                    ensure_capacity(byte_len, F::max_len())?;
                }
                let mut prefix = F::default();
                prefix.set(F::Value::from_raw(byte_len));
                let status = prefix.write(out)?;
                out.put(self.value.as_bytes())?;
                Ok(status)
            }

            fn len(&self) -> usize {
                let mut prefix = F::default();
                prefix.set(F::Value::from_raw(self.value.len() as u64));
                prefix.len().saturating_add(self.value.len())
            }

            fn min_len() -> usize {
                F::min_len()
            }

            fn max_len() -> usize {
                usize::MAX
            }
        }
    };
}

// Over bytes, an element count and a byte length are the same number;
// both spellings are accepted so a declaration can mirror its protocol
// documentation.
impl_prefixed_str!(CountPrefixed);
impl_prefixed_str!(BytesPrefixed);

impl<F: Field> Field for StrField<Terminated<F>> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let (sentinel, sentinel_len) = sentinel_bytes::<F>()?;
        let rest = cursor.rest();
        let mut idx = 0;
        loop {
            if idx + sentinel_len > rest.len() {
                return Err(CodecError::NotEnoughData {
                    missing: idx + sentinel_len - rest.len(),
                });
            }
            if rest[idx..idx + sentinel_len] == sentinel[..sentinel_len] {
                break;
            }
            idx += 1;
        }
        let content = &rest[..idx];
        cursor.advance(idx + sentinel_len)?;
        self.decode_utf8(content)
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        out.put(self.value.as_bytes())?;
        F::default().write(out)
    }

    fn len(&self) -> usize {
        self.value.len().saturating_add(F::default().len())
    }

    fn min_len() -> usize {
        F::min_len()
    }

    fn max_len() -> usize {
        usize::MAX
    }
}

impl<const N: usize> Field for StrField<FixedCount<N>> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let bytes = cursor.take(N)?;
        self.decode_utf8(bytes)
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        if self.value.len() != N {
            return Err(CodecError::InvalidData);
        }
        out.put(self.value.as_bytes())?;
        Ok(WriteStatus::Complete)
    }

    fn len(&self) -> usize {
        N
    }

    fn min_len() -> usize {
        N
    }

    fn max_len() -> usize {
        N
    }

    fn valid(&self) -> bool {
        self.value.len() == N
    }
}
