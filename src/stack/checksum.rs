//! Checksum layers: integrity over the inner frame bytes.
//!
//! The suffix flavor appends the checksum after the wrapped bytes; the
//! prefix flavor leads with it. Both recompute on read and compare,
//! failing with a protocol error on mismatch. On write, a random-access
//! sink gets the checksum in one pass; an append-only sink gets a
//! placeholder and `UpdateRequired`, finalized by the update pass.

use core::marker::PhantomData;

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::cursor::{PatchCursor, ReadCursor, SliceWriter, WriteCursor};
use crate::endian::WireInt;
use crate::error::{CodecError, Result, WriteStatus};
use crate::field::{Field, ValueField};
use crate::metrics;
use crate::stack::{record_field, widen_missing, Decoded, FrameLayer, FieldTrace, Trace};

/// Checksum calculator over a byte region.
///
/// The result is truncated to the checksum field's value type before
/// comparison or writing, so narrow fields work with wide calculators.
pub trait Checksum {
    /// Compute the checksum of `bytes`.
    fn compute(&self, bytes: &[u8]) -> u64;
}

/// Wrapping byte sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSum;

impl Checksum for BasicSum {
    fn compute(&self, bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .fold(0u64, |acc, byte| acc.wrapping_add(u64::from(*byte)))
    }
}

/// CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc16Ccitt;

impl Checksum for Crc16Ccitt {
    fn compute(&self, bytes: &[u8]) -> u64 {
        let mut crc: u16 = 0xFFFF;
        for &byte in bytes {
            crc ^= u16::from(byte) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        u64::from(crc)
    }
}

/// XXH3, 64-bit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh3;

impl Checksum for Xxh3 {
    fn compute(&self, bytes: &[u8]) -> u64 {
        xxh3_64(bytes)
    }
}

/// Serialize a checksum field into a scratch buffer for patching.
fn field_bytes<F: Field>(field: &F) -> Result<([u8; 16], usize)> {
    let mut buf = [0u8; 16];
    let mut writer = SliceWriter::new(&mut buf);
    field.write(&mut writer)?;
    let len = writer.written();
    Ok((buf, len))
}

/// Checksum appended after the wrapped bytes.
///
/// By default the inner layers read first and the checksum is verified
/// afterwards; [`verify_before_read`](Self::verify_before_read) flips
/// that, rejecting corrupt frames before any message is allocated.
pub struct ChecksumLayer<F, C, N> {
    calc: C,
    verify_first: bool,
    next: N,
    _marker: PhantomData<F>,
}

impl<F, C, N> ChecksumLayer<F, C, N> {
    /// Compose over the inner layer with a calculator.
    pub fn new(calc: C, next: N) -> Self {
        Self {
            calc,
            verify_first: false,
            next,
            _marker: PhantomData,
        }
    }

    /// Verify the checksum before invoking the inner read.
    #[must_use]
    pub fn verify_before_read(mut self) -> Self {
        self.verify_first = true;
        self
    }
}

impl<F, C, N> FrameLayer for ChecksumLayer<F, C, N>
where
    F: ValueField,
    F::Value: WireInt,
    C: Checksum,
    N: FrameLayer,
{
    type Msg = N::Msg;
    type Handle = N::Handle;

    fn min_frame_len(&self) -> usize {
        F::min_len() + self.next.min_frame_len()
    }

    fn frame_len(&self, msg: &Self::Msg) -> usize {
        F::default().len() + self.next.frame_len(msg)
    }

    fn read(
        &self,
        cursor: &mut ReadCursor<'_>,
        mut trace: Option<&mut Trace>,
    ) -> Result<Decoded<Self::Handle>> {
        let available = cursor.remaining();
        let flen = F::max_len();
        let needed = self.next.min_frame_len() + flen;
        if available < needed {
            return Err(CodecError::NotEnoughData {
                missing: (needed - available).max(1),
            });
        }

        let start = cursor.position();
        let budget = available - flen;

        if self.verify_first {
            // The checksum sits at the end of the window; read and
            // verify it before touching the inner layers.
            let mut tail = cursor.clone();
            tail.set_position(start + budget);
            let mut field = F::default();
            field.read(&mut tail)?;

            let computed = self.calc.compute(&cursor.rest()[..budget]);
            if field.get() != F::Value::from_raw(computed) {
                metrics::record_checksum_mismatch();
                debug!(computed, "checksum mismatch before read");
                return Err(CodecError::ProtocolError);
            }

            let mut window = cursor.window(budget);
            match self.next.read(&mut window, trace.as_mut().map(|t| &mut **t)) {
                Ok(decoded) => {
                    if let Some(t) = trace.as_mut() {
                        record_field(t, "checksum", &field);
                    }
                    cursor.set_position(tail.position());
                    Ok(decoded)
                }
                Err(err) => {
                    cursor.set_position(window.position());
                    Err(err)
                }
            }
        } else {
            let mut window = cursor.window(budget);
            match self.next.read(&mut window, trace.as_mut().map(|t| &mut **t)) {
                Ok(decoded) => {
                    cursor.set_position(window.position());
                    let region = cursor.span(start);
                    let computed = self.calc.compute(region);

                    let mut field = F::default();
                    field.read(cursor)?;
                    if field.get() != F::Value::from_raw(computed) {
                        metrics::record_checksum_mismatch();
                        debug!(computed, "checksum mismatch");
                        return Err(CodecError::ProtocolError);
                    }
                    if let Some(t) = trace.as_mut() {
                        record_field(t, "checksum", &field);
                    }
                    Ok(decoded)
                }
                // An inner shortfall also implies the checksum bytes
                // beyond the window are not where they should be.
                Err(CodecError::NotEnoughData { missing }) => {
                    cursor.set_position(window.position());
                    Err(CodecError::NotEnoughData {
                        missing: missing + flen,
                    })
                }
                Err(err) => {
                    cursor.set_position(window.position());
                    Err(err)
                }
            }
        }
    }

    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &Self::Msg,
        out: &mut W,
        mut trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        let start = out.written();
        let status = self
            .next
            .write(msg, out, trace.as_mut().map(|t| &mut **t))?;

        let computed = match out.view(start) {
            Some(region) if status == WriteStatus::Complete => Some(self.calc.compute(region)),
            _ => None,
        };

        let mut field = F::default();
        match computed {
            Some(value) => {
                field.set(F::Value::from_raw(value));
                let _ = field.write(out)?;
                if let Some(t) = trace.as_mut() {
                    record_field(t, "checksum", &field);
                }
                Ok(WriteStatus::Complete)
            }
            None => {
                // Placeholder; the update pass recomputes it.
                let _ = field.write(out)?;
                if let Some(t) = trace.as_mut() {
                    record_field(t, "checksum", &field);
                }
                Ok(WriteStatus::UpdateRequired)
            }
        }
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        let start = patch.position();
        let total = patch.remaining();
        let flen = F::max_len();
        if total < flen {
            return Err(CodecError::ProtocolError);
        }
        let inner_len = total - flen;
        {
            let mut window = patch.window(inner_len);
            self.next.update(&mut window)?;
        }
        patch.set_position(start + inner_len);

        let computed = self.calc.compute(patch.span(start));
        let mut field = F::default();
        field.set(F::Value::from_raw(computed));
        let _ = field.write(patch)?;
        Ok(())
    }
}

/// Checksum leading the wrapped bytes, computed over everything after
/// the field to the end of the enclosing window.
pub struct ChecksumPrefixLayer<F, C, N> {
    calc: C,
    next: N,
    _marker: PhantomData<F>,
}

impl<F, C, N> ChecksumPrefixLayer<F, C, N> {
    /// Compose over the inner layer with a calculator.
    pub fn new(calc: C, next: N) -> Self {
        Self {
            calc,
            next,
            _marker: PhantomData,
        }
    }
}

impl<F, C, N> FrameLayer for ChecksumPrefixLayer<F, C, N>
where
    F: ValueField,
    F::Value: WireInt,
    C: Checksum,
    N: FrameLayer,
{
    type Msg = N::Msg;
    type Handle = N::Handle;

    fn min_frame_len(&self) -> usize {
        F::min_len() + self.next.min_frame_len()
    }

    fn frame_len(&self, msg: &Self::Msg) -> usize {
        F::default().len() + self.next.frame_len(msg)
    }

    fn read(
        &self,
        cursor: &mut ReadCursor<'_>,
        mut trace: Option<&mut Trace>,
    ) -> Result<Decoded<Self::Handle>> {
        let available = cursor.remaining();
        let mut field = F::default();
        field
            .read(cursor)
            .map_err(|err| widen_missing(err, self.min_frame_len(), available))?;
        if let Some(t) = trace.as_mut() {
            record_field(t, "checksum", &field);
        }

        let computed = self.calc.compute(cursor.rest());
        if field.get() != F::Value::from_raw(computed) {
            metrics::record_checksum_mismatch();
            debug!(computed, "prefix checksum mismatch");
            return Err(CodecError::ProtocolError);
        }

        self.next.read(cursor, trace)
    }

    fn write<W: WriteCursor + ?Sized>(
        &self,
        msg: &Self::Msg,
        out: &mut W,
        mut trace: Option<&mut Trace>,
    ) -> Result<WriteStatus> {
        let trace_idx = trace.as_ref().map(|t| t.len());
        let field_at = out.written();
        let mut field = F::default();
        let _ = field.write(out)?;

        let inner_start = out.written();
        let status = self
            .next
            .write(msg, out, trace.as_mut().map(|t| &mut **t))?;

        let computed = match out.view(inner_start) {
            Some(region) if status == WriteStatus::Complete => Some(self.calc.compute(region)),
            _ => None,
        };

        let final_status = match computed {
            Some(value) => {
                field.set(F::Value::from_raw(value));
                let (buf, len) = field_bytes(&field)?;
                out.patch(field_at, &buf[..len])?;
                WriteStatus::Complete
            }
            None => WriteStatus::UpdateRequired,
        };

        if let (Some(t), Some(idx)) = (trace.as_mut(), trace_idx) {
            let (buf, len) = field_bytes(&field)?;
            t.insert(
                idx,
                FieldTrace {
                    layer: "checksum",
                    bytes: buf[..len].to_vec(),
                },
            );
        }
        Ok(final_status)
    }

    fn update(&self, patch: &mut PatchCursor<'_>) -> Result<()> {
        let start = patch.position();
        let flen = F::max_len();
        patch.advance(flen)?;
        let inner_start = patch.position();
        {
            let remaining = patch.remaining();
            let mut window = patch.window(remaining);
            self.next.update(&mut window)?;
        }
        let end = patch.len();
        patch.set_position(end);

        let computed = self.calc.compute(patch.span(inner_start));
        let mut field = F::default();
        field.set(F::Value::from_raw(computed));
        patch.set_position(start);
        let _ = field.write(patch)?;
        patch.set_position(end);
        Ok(())
    }
}
