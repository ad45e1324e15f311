//! Bitfields: sub-byte members packed into a fixed byte block.
//!
//! Members declare their width in bits and are packed least significant
//! end first in declaration order; the summed widths must land on a
//! whole byte boundary, enforced when the field is first used.

use core::fmt;
use core::marker::PhantomData;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::endian::{ByteOrder, WireInt};
use crate::error::{Result, WriteStatus};
use crate::field::Field;

/// Low `bits` bits set.
pub(crate) fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// One member of a bitfield, `BITS` wide on the wire.
pub trait BitsMember: Default {
    /// Width in bits.
    const BITS: u32;

    /// The member's bits, already masked to `BITS`.
    fn to_bits(&self) -> u64;

    /// Rebuild from extracted bits.
    fn from_bits(raw: u64) -> Self;

    /// Whether the member's value satisfies its invariants.
    fn valid(&self) -> bool {
        true
    }

    /// Re-derive dependent state; returns true iff anything changed.
    fn refresh(&mut self) -> bool {
        false
    }
}

/// Integer bitfield member holding the low `BITS` bits of `T`.
pub struct BitsInt<T: WireInt, const BITS: u32> {
    value: T,
}

impl<T: WireInt, const BITS: u32> BitsInt<T, BITS> {
    /// Construct with an explicit value; high bits are truncated.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: T::from_raw(value.to_raw() & low_mask(BITS)),
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    /// Replace the value; high bits are truncated.
    pub fn set_value(&mut self, value: T) {
        self.value = T::from_raw(value.to_raw() & low_mask(BITS));
    }
}

impl<T: WireInt, const BITS: u32> Default for BitsInt<T, BITS> {
    fn default() -> Self {
        Self {
            value: T::default(),
        }
    }
}

impl<T: WireInt, const BITS: u32> Clone for BitsInt<T, BITS> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: WireInt, const BITS: u32> Copy for BitsInt<T, BITS> {}

impl<T: WireInt, const BITS: u32> PartialEq for BitsInt<T, BITS> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: WireInt, const BITS: u32> Eq for BitsInt<T, BITS> {}

impl<T: WireInt, const BITS: u32> fmt::Debug for BitsInt<T, BITS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BitsInt").field(&self.value).finish()
    }
}

impl<T: WireInt, const BITS: u32> BitsMember for BitsInt<T, BITS> {
    const BITS: u32 = BITS;

    fn to_bits(&self) -> u64 {
        self.value.to_raw() & low_mask(BITS)
    }

    fn from_bits(raw: u64) -> Self {
        Self {
            value: T::from_raw(raw & low_mask(BITS)),
        }
    }
}

/// A declaration-ordered tuple of bitfield members.
pub trait BitsMembers: Default {
    /// Summed member widths.
    const TOTAL_BITS: u32;

    /// OR members into a zeroed word, least significant end first.
    fn pack(&self) -> u64;

    /// Extract members by shifting from the least significant end.
    fn unpack(raw: u64) -> Self;

    /// AND-fold of member validity.
    fn all_valid(&self) -> bool;

    /// OR-fold of member refresh.
    fn refresh_any(&mut self) -> bool;
}

macro_rules! impl_bits_members {
    ($($member:ident => $idx:tt),+) => {
        impl<$($member: BitsMember),+> BitsMembers for ($($member,)+) {
            const TOTAL_BITS: u32 = 0 $( + <$member as BitsMember>::BITS )+;

            fn pack(&self) -> u64 {
                let mut raw = 0u64;
                let mut shift = 0u32;
                $(
                    raw |= self.$idx.to_bits() << shift;
                    shift += <$member as BitsMember>::BITS;
                )+
                let _ = shift;
                raw
            }

            fn unpack(raw: u64) -> Self {
                let mut shift = 0u32;
                ($(
                    {
                        let bits = (raw >> shift) & low_mask(<$member as BitsMember>::BITS);
                        shift += <$member as BitsMember>::BITS;
                        let _ = shift;
                        <$member as BitsMember>::from_bits(bits)
                    },
                )+)
            }

            fn all_valid(&self) -> bool {
                true $( && self.$idx.valid() )+
            }

            fn refresh_any(&mut self) -> bool {
                let mut changed = false;
                $( changed |= self.$idx.refresh(); )+
                changed
            }
        }
    };
}

impl_bits_members!(M0 => 0);
impl_bits_members!(M0 => 0, M1 => 1);
impl_bits_members!(M0 => 0, M1 => 1, M2 => 2);
impl_bits_members!(M0 => 0, M1 => 1, M2 => 2, M3 => 3);
impl_bits_members!(M0 => 0, M1 => 1, M2 => 2, M3 => 3, M4 => 4);
impl_bits_members!(M0 => 0, M1 => 1, M2 => 2, M3 => 3, M4 => 4, M5 => 5);
impl_bits_members!(M0 => 0, M1 => 1, M2 => 2, M3 => 3, M4 => 4, M5 => 5, M6 => 6);
impl_bits_members!(M0 => 0, M1 => 1, M2 => 2, M3 => 3, M4 => 4, M5 => 5, M6 => 6, M7 => 7);

/// Bitfield over a member tuple, serialized as one integer block in the
/// chosen byte order.
pub struct BitsField<M: BitsMembers, O: ByteOrder> {
    members: M,
    _order: PhantomData<O>,
}

impl<M: BitsMembers, O: ByteOrder> BitsField<M, O> {
    /// Wire width; fails to compile when the member widths do not sum
    /// to a whole number of bytes.
    pub const BYTES: usize = {
        assert!(
            M::TOTAL_BITS % 8 == 0,
            "bitfield member widths must sum to a whole number of bytes"
        );
        (M::TOTAL_BITS / 8) as usize
    };

    /// Construct from a member tuple.
    #[must_use]
    pub fn new(members: M) -> Self {
        Self {
            members,
            _order: PhantomData,
        }
    }

    /// Member tuple.
    #[must_use]
    pub fn members(&self) -> &M {
        &self.members
    }

    /// Mutable member tuple.
    pub fn members_mut(&mut self) -> &mut M {
        &mut self.members
    }
}

impl<M: BitsMembers, O: ByteOrder> Default for BitsField<M, O> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: BitsMembers + Clone, O: ByteOrder> Clone for BitsField<M, O> {
    fn clone(&self) -> Self {
        Self::new(self.members.clone())
    }
}

impl<M: BitsMembers + PartialEq, O: ByteOrder> PartialEq for BitsField<M, O> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<M: BitsMembers + fmt::Debug, O: ByteOrder> fmt::Debug for BitsField<M, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BitsField").field(&self.members).finish()
    }
}

impl<M: BitsMembers, O: ByteOrder> Field for BitsField<M, O> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        let bytes = cursor.take(Self::BYTES)?;
        self.members = M::unpack(O::get_uint(bytes));
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        let mut buf = [0u8; 8];
        O::put_uint(&mut buf[..Self::BYTES], self.members.pack());
        out.put(&buf[..Self::BYTES])?;
        Ok(WriteStatus::Complete)
    }

    fn len(&self) -> usize {
        Self::BYTES
    }

    fn min_len() -> usize {
        Self::BYTES
    }

    fn max_len() -> usize {
        Self::BYTES
    }

    fn valid(&self) -> bool {
        self.members.all_valid()
    }

    fn refresh(&mut self) -> bool {
        self.members.refresh_any()
    }
}
