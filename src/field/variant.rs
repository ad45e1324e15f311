//! Variant fields: a tagged union over a fixed set of alternatives.
//!
//! On read the alternatives are attempted in declared order from the
//! same start position; the first to decode successfully wins and the
//! cursor commits at its end. When none succeed the last failure is
//! propagated with the cursor at that attempt's stop position.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::Field;

macro_rules! define_variant {
    ($(#[$meta:meta])* $name:ident, $($var:ident : $alt:ident),+) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name<$($alt: Field),+> {
            /// No alternative holds a value yet.
            Unset,
            $(
                #[doc = concat!("Alternative `", stringify!($var), "`.")]
                $var($alt),
            )+
        }

        impl<$($alt: Field),+> Default for $name<$($alt),+> {
            fn default() -> Self {
                Self::Unset
            }
        }

        impl<$($alt: Field),+> Field for $name<$($alt),+> {
            fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
                let start = cursor.position();
                let mut last_err = CodecError::ProtocolError;
                $(
                    cursor.set_position(start);
                    let mut alt = <$alt>::default();
                    match alt.read(cursor) {
                        Ok(()) => {
                            *self = Self::$var(alt);
                            return Ok(());
                        }
                        Err(err) => last_err = err,
                    }
                )+
                Err(last_err)
            }

            fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
                match self {
                    // Writing before any alternative was selected is a
                    // content error, not a framing one.
                    Self::Unset => Err(CodecError::InvalidData),
                    $( Self::$var(alt) => alt.write(out), )+
                }
            }

            fn len(&self) -> usize {
                match self {
                    Self::Unset => 0,
                    $( Self::$var(alt) => alt.len(), )+
                }
            }

            fn min_len() -> usize {
                let mut min = usize::MAX;
                $( min = min.min(<$alt as Field>::min_len()); )+
                min
            }

            fn max_len() -> usize {
                let mut max = 0usize;
                $( max = max.max(<$alt as Field>::max_len()); )+
                max
            }

            fn valid(&self) -> bool {
                match self {
                    Self::Unset => false,
                    $( Self::$var(alt) => alt.valid(), )+
                }
            }

            fn refresh(&mut self) -> bool {
                match self {
                    Self::Unset => false,
                    $( Self::$var(alt) => alt.refresh(), )+
                }
            }
        }
    };
}

define_variant!(
    /// Two-alternative variant field.
    Variant2, First: A, Second: B
);
define_variant!(
    /// Three-alternative variant field.
    Variant3, First: A, Second: B, Third: C
);
define_variant!(
    /// Four-alternative variant field.
    Variant4, First: A, Second: B, Third: C, Fourth: D
);
