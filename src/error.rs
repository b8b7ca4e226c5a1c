use crate::xcom::packet::{ObjectType, ServiceId};
use crate::xcom::value::ValueKind;

use std::time::Duration;
use thiserror::Error;

/// Every failure an Xcom exchange can end with.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no peer connected within {0:?}")]
    ConnectTimeout(Duration),

    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    #[error("connection closed by peer")]
    PeerClosed,

    #[error("gave up after {attempts} attempts waiting for {service:?} of object {object_id}: {last}")]
    RetriesExhausted {
        attempts: u32,
        service: ServiceId,
        object_id: u32,
        last: Box<Error>,
    },

    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("truncated frame: need {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    #[error("{section} checksum mismatch: got {actual:02x?}, expected {expected:02x?}")]
    ChecksumMismatch {
        section: &'static str,
        expected: [u8; 2],
        actual: [u8; 2],
    },

    #[error("invalid start byte 0x{0:02x}")]
    InvalidStartByte(u8),

    #[error("unknown {field} 0x{value:x}")]
    UnknownField { field: &'static str, value: u32 },

    #[error("malformed {kind:?} value: expected {expected} bytes, got {actual}")]
    MalformedValue {
        kind: ValueKind,
        expected: usize,
        actual: usize,
    },

    #[error("cannot parse {input:?} as {kind:?}")]
    UnparsableValue { kind: ValueKind, input: String },

    #[error("{value} is out of range for {kind:?}")]
    ValueOutOfRange { kind: ValueKind, value: String },

    #[error("device returned error 0x{code:04x} ({reason})")]
    Protocol { code: u16, reason: &'static str },

    #[error(
        "unexpected response: wanted {expected_service:?}/{expected_type:?} {expected_object}, got {got_service:?}/{got_type:?} {got_object}"
    )]
    UnexpectedResponse {
        expected_service: ServiceId,
        expected_type: ObjectType,
        expected_object: u32,
        got_service: ServiceId,
        got_type: ObjectType,
        got_object: u32,
    },
}

impl Error {
    /// Failures that mean "this read was garbage" rather than "the exchange is over".
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Error::TruncatedFrame { .. }
                | Error::ChecksumMismatch { .. }
                | Error::InvalidStartByte(_)
                | Error::UnknownField { .. }
                | Error::MalformedValue { .. }
        )
    }

    /// The device's symbolic reason, when this is an in-band error.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Error::Protocol { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
