//! Optional fields: encoded only while in the `Exists` mode.
//!
//! The mode is driven externally, typically by a refresh rule keyed on
//! another field's value; the codec itself never flips it.

use core::fmt;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{Result, WriteStatus};
use crate::field::Field;

/// Presence mode of an [`OptionalField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptMode {
    /// The field contributes no wire bytes.
    #[default]
    Missing,
    /// The field is encoded.
    Exists,
}

/// A field that may be absent from the wire.
pub struct OptionalField<F> {
    field: F,
    mode: OptMode,
}

impl<F: Field> OptionalField<F> {
    /// Construct in the `Exists` mode.
    #[must_use]
    pub fn present(field: F) -> Self {
        Self {
            field,
            mode: OptMode::Exists,
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> OptMode {
        self.mode
    }

    /// Switch mode.
    pub fn set_mode(&mut self, mode: OptMode) {
        self.mode = mode;
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
}

impl<F: Field> Default for OptionalField<F> {
    fn default() -> Self {
        Self {
            field: F::default(),
            mode: OptMode::Missing,
        }
    }
}

impl<F: Field + Clone> Clone for OptionalField<F> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            mode: self.mode,
        }
    }
}

impl<F: Field + PartialEq> PartialEq for OptionalField<F> {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.field == other.field
    }
}

impl<F: Field + fmt::Debug> fmt::Debug for OptionalField<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionalField")
            .field("mode", &self.mode)
            .field("field", &self.field)
            .finish()
    }
}

impl<F: Field> Field for OptionalField<F> {
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<()> {
        match self.mode {
            OptMode::Missing => Ok(()),
            OptMode::Exists => self.field.read(cursor),
        }
    }

    fn write<W: WriteCursor + ?Sized>(&self, out: &mut W) -> Result<WriteStatus> {
        match self.mode {
            OptMode::Missing => Ok(WriteStatus::Complete),
            OptMode::Exists => self.field.write(out),
        }
    }

    fn len(&self) -> usize {
        match self.mode {
            OptMode::Missing => 0,
            OptMode::Exists => self.field.len(),
        }
    }

    fn min_len() -> usize {
        0
    }

    fn max_len() -> usize {
        F::max_len()
    }

    fn valid(&self) -> bool {
        match self.mode {
            OptMode::Missing => true,
            OptMode::Exists => self.field.valid(),
        }
    }

    fn refresh(&mut self) -> bool {
        match self.mode {
            OptMode::Missing => false,
            OptMode::Exists => self.field.refresh(),
        }
    }
}
