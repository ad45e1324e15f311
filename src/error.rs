//! Status values shared by every codec operation.

use thiserror::Error;

/// Codec failure statuses.
///
/// Errors are plain values; no failure on a decode or encode path is
/// reported by panicking. The framing caller decides how to recover:
/// [`NotEnoughData`](CodecError::NotEnoughData) means "wait for more
/// bytes", while [`ProtocolError`](CodecError::ProtocolError) and
/// [`InvalidMsgId`](CodecError::InvalidMsgId) mean "advance one byte and
/// resynchronize".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before the current element could be decoded.
    #[error("not enough data: at least {missing} more byte(s) required")]
    NotEnoughData {
        /// Minimum number of additional bytes required to make progress.
        missing: usize,
    },

    /// The output sink cannot hold the bytes being written.
    #[error("output buffer overflow: need {needed} bytes, got {got}")]
    BufferOverflow {
        /// Bytes the operation needed.
        needed: usize,
        /// Bytes the sink could hold.
        got: usize,
    },

    /// The decoded message ID does not name any known message type.
    #[error("unknown message id: {id:#x}")]
    InvalidMsgId {
        /// The offending wire value.
        id: u64,
    },

    /// The message was framed correctly but failed a validity check.
    #[error("message contents failed validity checks")]
    InvalidData,

    /// The message allocator refused to produce an instance.
    #[error("message allocation failed")]
    AllocFailure,

    /// Wire contents violate the declared layout.
    #[error("protocol error: wire contents violate the declared layout")]
    ProtocolError,

    /// The operation is not available on this composition.
    #[error("operation not supported by this composition")]
    NotSupported,
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, CodecError>;

/// Outcome of a successful write.
///
/// [`UpdateRequired`](WriteStatus::UpdateRequired) is not a failure: it
/// signals that a second `update` pass with a random-access cursor over
/// the just-written region is needed to finalize deferred transport
/// fields (checksums, sizes written through an append-only sink).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WriteStatus {
    /// All bytes are final.
    Complete,
    /// An `update` pass over the written region is required.
    UpdateRequired,
}

impl WriteStatus {
    /// Combine two statuses; a pending update on either side survives.
    pub fn merge(self, other: WriteStatus) -> WriteStatus {
        if self == WriteStatus::UpdateRequired || other == WriteStatus::UpdateRequired {
            WriteStatus::UpdateRequired
        } else {
            WriteStatus::Complete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_pending_update() {
        assert_eq!(
            WriteStatus::Complete.merge(WriteStatus::Complete),
            WriteStatus::Complete
        );
        assert_eq!(
            WriteStatus::Complete.merge(WriteStatus::UpdateRequired),
            WriteStatus::UpdateRequired
        );
        assert_eq!(
            WriteStatus::UpdateRequired.merge(WriteStatus::Complete),
            WriteStatus::UpdateRequired
        );
    }

    #[test]
    fn errors_render_diagnostics() {
        let err = CodecError::NotEnoughData { missing: 3 };
        assert!(err.to_string().contains('3'));

        let err = CodecError::InvalidMsgId { id: 0x42 };
        assert!(err.to_string().contains("0x42"));
    }
}
