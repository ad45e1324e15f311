//! Zero-width fields.

use core::fmt;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{Result, WriteStatus};
use crate::field::Field;

/// Always-valid placeholder occupying no wire bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoValueField;

impl Field for NoValueField {
    fn read(&mut self, _cursor: &mut ReadCursor<'_>) -> Result<()> {
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, _out: &mut W) -> Result<WriteStatus> {
        Ok(WriteStatus::Complete)
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

/// Holds a field's value while contributing no wire bytes.
///
/// Used for attributes that participate in validity and refresh but are
/// carried out of band (a transport-layer value mirrored into the
/// message, a version pin, …).
pub struct Unserialized<F> {
    field: F,
}

impl<F: Field> Unserialized<F> {
    /// Wrap a field.
    #[must_use]
    pub fn new(field: F) -> Self {
        Self { field }
    }

    /// Inner field.
    #[must_use]
    pub fn field(&self) -> &F {
        &self.field
    }

    /// Mutable inner field.
    pub fn field_mut(&mut self) -> &mut F {
        &mut self.field
    }

    /// Unwrap.
    #[must_use]
    pub fn into_inner(self) -> F {
        self.field
    }
}

impl<F: Field> Default for Unserialized<F> {
    fn default() -> Self {
        Self {
            field: F::default(),
        }
    }
}

impl<F: Field + Clone> Clone for Unserialized<F> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
        }
    }
}

impl<F: Field + PartialEq> PartialEq for Unserialized<F> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
    }
}

impl<F: Field + fmt::Debug> fmt::Debug for Unserialized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unserialized").field(&self.field).finish()
    }
}

impl<F: Field> Field for Unserialized<F> {
    fn read(&mut self, _cursor: &mut ReadCursor<'_>) -> Result<()> {
        Ok(())
    }

    fn write<W: WriteCursor + ?Sized>(&self, _out: &mut W) -> Result<WriteStatus> {
        Ok(WriteStatus::Complete)
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

    fn valid(&self) -> bool {
        self.field.valid()
    }

    fn refresh(&mut self) -> bool {
        self.field.refresh()
    }
}
