//! Sequence fields (array lists).
//!
//! A sequence owns a vector of element fields and exactly one
//! termination discipline, chosen as a type parameter: an open tail,
//! a static element count, an element-count prefix, a byte-length
//! prefix, a sentinel terminator, or a fixed count with a trailer.
//! Picking the discipline by type makes conflicting combinations
//! unrepresentable.

use core::fmt;
use core::marker::PhantomData;

use crate::cursor::{ReadCursor, SliceWriter, WriteCursor};
use crate::endian::WireInt;
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{ensure_capacity, Field, ValueField};

/// Consume every remaining byte of the enclosing window; an externally
/// forced element count may override that.
pub struct Open;

/// Exactly `N` elements, no count on the wire.
pub struct FixedCount<const N: usize>;

/// Element count carried by a preceding field `F`.
pub struct CountPrefixed<F>(PhantomData<F>);

/// Serialized byte length carried by a preceding field `F`; reading
/// consumes exactly that many bytes or fails with a protocol error.
pub struct BytesPrefixed<F>(PhantomData<F>);

/// Elements followed by the serialization of a default-valued `F`;
/// the terminator is consumed but not stored.
pub struct Terminated<F>(PhantomData<F>);

/// Exactly `N` elements followed by a trailer field `F`.
pub struct Trailing<F, const N: usize>(PhantomData<F>);

/// Sequence of element fields `T` under discipline `D`.
pub struct SeqField<T, D> {
    items: Vec<T>,
    forced: Option<usize>,
    _discipline: PhantomData<D>,
}

impl<T: Field, D> SeqField<T, D> {
    /// Empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            forced: None,
            _discipline: PhantomData,
        }
    }

    /// Construct from existing elements.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            forced: None,
            _discipline: PhantomData,
        }
    }

    /// Elements.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Mutable access to the element vector.
    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    /// Append an element.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    fn items_len(&self) -> usize {
        self.items.iter().map(Field::len).sum()
    }

    fn write_items<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let mut status = WriteStatus::Complete;
        for item in &self.items {
            status = status.merge(item.write(out)?);
        }
        Ok(status)
    }

    fn read_one(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let before = cursor.position();
        let mut item = T::default();
        item.read(cursor)?;
        if cursor.position() == before {
            // A zero-width element would never drain the input.
            return Err(CodecError::ProtocolError);
        }
        self.items.push(item);
        Ok(())
    }
}

impl<T: Field> SeqField<T, Open> {
    /// Force the next read to consume exactly `count` elements instead
    /// of draining the window.
    pub fn force_count(&mut self, count: usize) {
        self.forced = Some(count);
    }

    /// Clear a previously forced count.
    pub fn clear_forced_count(&mut self) {
        self.forced = None;
    }
}

impl<T: Field, D> Default for SeqField<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Field + Clone, D> Clone for SeqField<T, D> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            forced: self.forced,
            _discipline: PhantomData,
        }
    }
}

impl<T: Field + PartialEq, D> PartialEq for SeqField<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Field + fmt::Debug, D> fmt::Debug for SeqField<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

/// Serialize the default-valued terminator/trailer field into a scratch
/// buffer for byte-for-byte comparison.
pub(crate) fn sentinel_bytes<F: Field>() -> Result<([u8; 16], usize)> {
    let sentinel = F::default();
    let mut buf = [0u8; 16];
    let mut writer = SliceWriter::new(&mut buf);
    sentinel
        .write(&mut writer)
        .map_err(|_| CodecError::ProtocolError)?;
    let len = writer.written();
    Ok((buf, len))
}

impl<T: Field> Field for SeqField<T, Open> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        self.items.clear();
        match self.forced {
            Some(count) => {
                for _ in 0..count {
                    self.read_one(cursor)?;
                }
            }
            None => {
                while !cursor.at_end() {
                    self.read_one(cursor)?;
                }
            }
        }
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        self.write_items(out)
    }

    fn len(&self) -> usize {
        self.items_len()
    }

    fn min_len() -> usize {
        0
    }

    fn max_len() -> usize {
        usize::MAX
    }

    fn valid(&self) -> bool {
        self.items.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

impl<T: Field, const N: usize> Field for SeqField<T, FixedCount<N>> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        self.items.clear();
        for _ in 0..N {
            self.read_one(cursor)?;
        }
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        if self.items.len() != N {
            return Err(CodecError::InvalidData);
        }
        self.write_items(out)
    }

    fn len(&self) -> usize {
        self.items_len()
    }

    fn min_len() -> usize {
        N.saturating_mul(T::min_len())
    }

    fn max_len() -> usize {
        N.saturating_mul(T::max_len())
    }

    fn valid(&self) -> bool {
        self.items.len() == N && self.items.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

impl<T, F> Field for SeqField<T, CountPrefixed<F>>
where
    T: Field,
    F: ValueField,
    F::Value: WireInt,
{
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let mut prefix = F::default();
        prefix.read(cursor)?;
        let count = prefix.get().to_raw() as usize;
        self.items.clear();
        for _ in 0..count {
            self.read_one(cursor)?;
        }
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let count = self.items.len() as u64;
        if F::min_len() == F::max_len() {
            ensure_capacity(count, F::max_len())?;
        }
        let mut prefix = F::default();
        prefix.set(F::Value::from_raw(count));
        let status = prefix.write(out)?;
        Ok(status.merge(self.write_items(out)?))
    }

    fn len(&self) -> usize {
        let mut prefix = F::default();
        prefix.set(F::Value::from_raw(self.items.len() as u64));
        prefix.len().saturating_add(self.items_len())
    }

    fn min_len() -> usize {
        F::min_len()
    }

    fn max_len() -> usize {
        usize::MAX
    }

    fn valid(&self) -> bool {
        self.items.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

impl<T, F> Field for SeqField<T, BytesPrefixed<F>>
where
    T: Field,
    F: ValueField,
    F::Value: WireInt,
{
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let mut prefix = F::default();
        prefix.read(cursor)?;
        let window_len = prefix.get().to_raw() as usize;
        if cursor.remaining() < window_len {
            return Err(CodecError::NotEnoughData {
                missing: window_len - cursor.remaining(),
            });
        }

        let end = cursor.position() + window_len;
        let mut window = cursor.window(window_len);
        self.items.clear();
        while !window.at_end() {
            match self.read_one(&mut window) {
                Ok(()) => {}
                // The declared byte window must hold whole elements.
                Err(CodecError::NotEnoughData { .. }) => {
                    cursor.set_position(window.position());
                    return Err(CodecError::ProtocolError);
                }
                Err(err) => {
                    cursor.set_position(window.position());
                    return Err(err);
                }
            }
        }
        cursor.set_position(end);
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let byte_len = self.items_len() as u64;
        if F::min_len() == F::max_len() {
            ensure_capacity(byte_len, F::max_len())?;
        }
        let mut prefix = F::default();
        prefix.set(F::Value::from_raw(byte_len));
        let status = prefix.write(out)?;
        Ok(status.merge(self.write_items(out)?))
    }

    fn len(&self) -> usize {
        let mut prefix = F::default();
        prefix.set(F::Value::from_raw(self.items_len() as u64));
        prefix.len().saturating_add(self.items_len())
    }

    fn min_len() -> usize {
        F::min_len()
    }

    fn max_len() -> usize {
        usize::MAX
    }

    fn valid(&self) -> bool {
        self.items.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

impl<T, F> Field for SeqField<T, Terminated<F>>
where
    T: Field,
    F: Field,
{
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let (sentinel, sentinel_len) = sentinel_bytes::<F>()?;
        self.items.clear();
        loop {
            match cursor.peek(sentinel_len) {
                Some(ahead) if ahead == &sentinel[..sentinel_len] => {
                    cursor.advance(sentinel_len)?;
                    return Ok(());
                }
                Some(_) => self.read_one(cursor)?,
                None => {
                    return Err(CodecError::NotEnoughData {
                        missing: sentinel_len - cursor.remaining(),
                    });
                }
            }
        }
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let status = self.write_items(out)?;
        Ok(status.merge(F::default().write(out)?))
    }

    fn len(&self) -> usize {
        self.items_len().saturating_add(F::default().len())
    }

    fn min_len() -> usize {
        F::min_len()
    }

    fn max_len() -> usize {
        usize::MAX
    }

    fn valid(&self) -> bool {
        self.items.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

impl<T, F, const N: usize> Field for SeqField<T, Trailing<F, N>>
where
    T: Field,
    F: Field,
{
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        self.items.clear();
        for _ in 0..N {
            self.read_one(cursor)?;
        }
        let mut trailer = F::default();
        trailer.read(cursor)?;
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        if self.items.len() != N {
            return Err(CodecError::InvalidData);
        }
        let status = self.write_items(out)?;
        Ok(status.merge(F::default().write(out)?))
    }

    fn len(&self) -> usize {
        self.items_len().saturating_add(F::default().len())
    }

    fn min_len() -> usize {
        N.saturating_mul(T::min_len()).saturating_add(F::min_len())
    }

    fn max_len() -> usize {
        N.saturating_mul(T::max_len()).saturating_add(F::max_len())
    }

    fn valid(&self) -> bool {
        self.items.len() == N && self.items.iter().all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::BigEndian;
    use crate::field::{IntField, IntSpec, Plain};

    type U8 = IntField<Plain<u8, BigEndian>>;
    type U16 = IntField<Plain<u16, BigEndian>>;

    fn write_to_vec<F: Field>(field: &F) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = crate::cursor::VecWriter::new(&mut out);
        let _ = field.write(&mut writer).unwrap();
        out
    }

    #[test]
    fn open_sequence_drains_the_window() {
        let mut seq = SeqField::<U16, Open>::default();
        let bytes = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03];
        seq.read(&mut ReadCursor::new(&bytes)).unwrap();
        let values: Vec<u16> = seq.items().iter().map(IntField::value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(seq.len(), 6);
    }

    #[test]
    fn forced_count_overrides_drain() {
        let mut seq = SeqField::<U8, Open>::default();
        seq.force_count(2);
        let bytes = [1, 2, 3, 4];
        let mut cursor = ReadCursor::new(&bytes);
        seq.read(&mut cursor).unwrap();
        assert_eq!(seq.items().len(), 2);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn count_prefix_bounds_the_elements() {
        let mut seq = SeqField::<U16, CountPrefixed<U8>>::default();
        let bytes = [2, 0x00, 0x0A, 0x00, 0x0B];
        let mut cursor = ReadCursor::new(&bytes);
        seq.read(&mut cursor).unwrap();
        assert_eq!(seq.items().len(), 2);
        assert!(cursor.at_end());

        assert_eq!(write_to_vec(&seq), bytes.to_vec());
    }

    #[test]
    fn byte_prefix_requires_exact_consumption() {
        // Window of 3 bytes cannot hold whole u16 elements.
        let mut seq = SeqField::<U16, BytesPrefixed<U8>>::default();
        let bytes = [3, 0x00, 0x0A, 0x00];
        assert_eq!(
            seq.read(&mut ReadCursor::new(&bytes)),
            Err(CodecError::ProtocolError)
        );
    }

    #[test]
    fn byte_prefix_roundtrip() {
        let mut seq = SeqField::<U16, BytesPrefixed<U8>>::default();
        seq.push(U16::new(0x0A0B));
        seq.push(U16::new(0x0C0D));
        let wire = write_to_vec(&seq);
        assert_eq!(wire, vec![4, 0x0A, 0x0B, 0x0C, 0x0D]);

        let mut decoded = SeqField::<U16, BytesPrefixed<U8>>::default();
        let mut cursor = ReadCursor::new(&wire);
        decoded.read(&mut cursor).unwrap();
        assert_eq!(decoded, seq);
        assert!(cursor.at_end());
    }

    #[test]
    fn byte_prefix_truncated_window_reports_missing() {
        let mut seq = SeqField::<U16, BytesPrefixed<U8>>::default();
        let bytes = [4, 0x0A, 0x0B];
        assert_eq!(
            seq.read(&mut ReadCursor::new(&bytes)),
            Err(CodecError::NotEnoughData { missing: 2 })
        );
    }

    #[test]
    fn terminator_is_consumed_but_not_stored() {
        // Default-valued u8 serializes as 0x00: a NUL sentinel.
        let mut seq = SeqField::<U8, Terminated<U8>>::default();
        let bytes = [5, 6, 0, 7];
        let mut cursor = ReadCursor::new(&bytes);
        seq.read(&mut cursor).unwrap();
        let values: Vec<u8> = seq.items().iter().map(IntField::value).collect();
        assert_eq!(values, vec![5, 6]);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn missing_terminator_wants_more_data() {
        let mut seq = SeqField::<U8, Terminated<U8>>::default();
        assert_eq!(
            seq.read(&mut ReadCursor::new(&[5, 6])),
            Err(CodecError::NotEnoughData { missing: 1 })
        );
    }

    #[test]
    fn fixed_count_requires_exactly_n() {
        let mut seq = SeqField::<U8, FixedCount<3>>::default();
        seq.read(&mut ReadCursor::new(&[1, 2, 3])).unwrap();
        assert!(seq.valid());

        seq.items_mut().pop();
        assert!(!seq.valid());
        let mut out = Vec::new();
        let mut writer = crate::cursor::VecWriter::new(&mut out);
        assert_eq!(seq.write(&mut writer), Err(CodecError::InvalidData));
    }

    #[test]
    fn trailer_follows_the_fixed_elements() {
        let mut seq = SeqField::<U8, Trailing<U8, 2>>::default();
        let mut cursor = ReadCursor::new(&[9, 8, 0]);
        seq.read(&mut cursor).unwrap();
        assert_eq!(seq.items().len(), 2);
        assert!(cursor.at_end());

        assert_eq!(write_to_vec(&seq), vec![9, 8, 0]);
    }
}
