//! Track codec counters without external dependencies.

use std::sync::atomic::{AtomicU64, Ordering};

static FRAMES_DECODED: AtomicU64 = AtomicU64::new(0);
static INVALID_FRAMES: AtomicU64 = AtomicU64::new(0);
static GARBAGE_BYTES: AtomicU64 = AtomicU64::new(0);
static RESYNC_SKIPS: AtomicU64 = AtomicU64::new(0);
static CHECKSUM_MISMATCHES: AtomicU64 = AtomicU64::new(0);

#[inline]
pub(crate) fn record_frame() {
    FRAMES_DECODED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_invalid_frame() {
    INVALID_FRAMES.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_garbage(bytes: usize) {
    GARBAGE_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_resync() {
    RESYNC_SKIPS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_checksum_mismatch() {
    CHECKSUM_MISMATCHES.fetch_add(1, Ordering::Relaxed);
}

/// Lightweight snapshot of the codec counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSnapshot {
    /// Frames decoded successfully, valid or not.
    pub frames_decoded: u64,
    /// Frames that were framed correctly but failed validity checks.
    pub invalid_frames: u64,
    /// Bytes skipped as unsynchronizable garbage.
    pub garbage_bytes: u64,
    /// One-byte resynchronization steps taken.
    pub resync_skips: u64,
    /// Checksum comparisons that failed.
    pub checksum_mismatches: u64,
}

/// Read the current counter values.
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        frames_decoded: FRAMES_DECODED.load(Ordering::Relaxed),
        invalid_frames: INVALID_FRAMES.load(Ordering::Relaxed),
        garbage_bytes: GARBAGE_BYTES.load(Ordering::Relaxed),
        resync_skips: RESYNC_SKIPS.load(Ordering::Relaxed),
        checksum_mismatches: CHECKSUM_MISMATCHES.load(Ordering::Relaxed),
    }
}
