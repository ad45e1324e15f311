//! Bundles: fixed tuples of member fields serialized back to back.
//!
//! Plain tuples of fields implement [`Field`] directly; read and write
//! order is declaration order, length is the member sum and validity
//! the member AND. A member whose own policy fails the read
//! short-circuits the whole bundle.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{Result, WriteStatus};
use crate::field::Field;

macro_rules! impl_field_for_tuple {
    ($($member:ident => $idx:tt),+) => {
        impl<$($member: Field),+> Field for ($($member,)+) {
            fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
                $( self.$idx.read(cursor)?; )+
                Ok(())
            }

            fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
                let mut status = WriteStatus::Complete;
                $( status = status.merge(self.$idx.write(out)?); )+
                Ok(status)
            }

            fn len(&self) -> usize {
                0usize $( .saturating_add(self.$idx.len()) )+
            }

            fn min_len() -> usize {
                0usize $( .saturating_add(<$member as Field>::min_len()) )+
            }

            fn max_len() -> usize {
                0usize $( .saturating_add(<$member as Field>::max_len()) )+
            }

            fn valid(&self) -> bool {
                true $( && self.$idx.valid() )+
            }

            fn refresh(&mut self) -> bool {
                let mut changed = false;
                $( changed |= self.$idx.refresh(); )+
                changed
            }
        }
    };
}

impl_field_for_tuple!(F0 => 0);
impl_field_for_tuple!(F0 => 0, F1 => 1);
impl_field_for_tuple!(F0 => 0, F1 => 1, F2 => 2);
impl_field_for_tuple!(F0 => 0, F1 => 1, F2 => 2, F3 => 3);
impl_field_for_tuple!(F0 => 0, F1 => 1, F2 => 2, F3 => 3, F4 => 4);
impl_field_for_tuple!(F0 => 0, F1 => 1, F2 => 2, F3 => 3, F4 => 4, F5 => 5);
impl_field_for_tuple!(F0 => 0, F1 => 1, F2 => 2, F3 => 3, F4 => 4, F5 => 5, F6 => 6);
impl_field_for_tuple!(F0 => 0, F1 => 1, F2 => 2, F3 => 3, F4 => 4, F5 => 5, F6 => 6, F7 => 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::SliceWriter;
    use crate::endian::BigEndian;
    use crate::error::CodecError;
    use crate::field::{IntField, InvalidPolicy, IntSpec, Plain};

    type U8 = IntField<Plain<u8, BigEndian>>;
    type U16 = IntField<Plain<u16, BigEndian>>;

    #[test]
    fn members_serialize_in_declaration_order() {
        let bundle = (U8::new(0x01), U16::new(0x0203));
        let mut buf = [0u8; 3];
        let _ = bundle.write(&mut SliceWriter::new(&mut buf)).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03]);
        assert_eq!(bundle.len(), 3);
        assert_eq!(<(U8, U16)>::min_len(), 3);

        let mut decoded = <(U8, U16)>::default();
        let mut cursor = ReadCursor::new(&buf);
        decoded.read(&mut cursor).unwrap();
        assert_eq!(decoded.0.value(), 0x01);
        assert_eq!(decoded.1.value(), 0x0203);
    }

    struct NonZero;
    impl IntSpec for NonZero {
        type Value = u8;
        type Order = BigEndian;
        const ON_INVALID: InvalidPolicy = InvalidPolicy::Fail;
        fn default_value() -> u8 {
            1
        }
        fn is_valid(value: u8) -> bool {
            value != 0
        }
    }

    #[test]
    fn failing_member_short_circuits() {
        let mut bundle = <(IntField<NonZero>, U16)>::default();
        let mut cursor = ReadCursor::new(&[0x00, 0xAA, 0xBB]);
        assert_eq!(bundle.read(&mut cursor), Err(CodecError::InvalidData));
        // The cursor stops where the decision was made.
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn validity_is_the_member_and() {
        let bundle = (U8::new(1), U16::new(2));
        assert!(bundle.valid());
    }
}
