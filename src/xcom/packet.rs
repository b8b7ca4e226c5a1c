use crate::error::{Error, Result};
use crate::xcom::datapoint::Registry;
use crate::xcom::transport::MAX_FRAME_SIZE;
use crate::xcom::value::{self, Value, ValueKind};

use log::trace;
use nom::IResult;
use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use std::convert::TryFrom;

pub const START_BYTE: u8 = 0xAA;
/// Terminator used by the RS-232 variant of the protocol; IP transports don't send it.
pub const RS232_TERM: [u8; 2] = [0x0D, 0x0A];

pub const HEADER_LEN: usize = 14;
pub const SERVICE_HEADER_LEN: usize = 10;
pub const CHECKSUM_LEN: usize = 2;
pub const MIN_FRAME_LEN: usize = HEADER_LEN + SERVICE_HEADER_LEN + CHECKSUM_LEN;

pub const DEFAULT_SRC_ADDR: u32 = 1;
pub const DEFAULT_DST_ADDR: u32 = 101;

const FLAG_ERROR: u8 = 0b01;
const FLAG_RESPONSE: u8 = 0b10;

// {{{ ServiceId
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u8)]
pub enum ServiceId {
    ReadProperty = 0x01,
    WriteProperty = 0x02,
}
// }}}

// {{{ ObjectType
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum ObjectType {
    Info = 1,
    Parameter = 2,
    Message = 3,
    Datalog = 5,
}
// }}}

// {{{ PropertyId
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum PropertyId {
    Value = 0x05,
    Min = 0x06,
    Max = 0x07,
    Level = 0x08,
    UnsavedValue = 0x0D,
}
// }}}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Direction {
    Request,
    Response,
}

// {{{ ErrorCode
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum ErrorCode {
    InvalidFrame = 0x0001,
    DeviceNotFound = 0x0002,
    ResponseTimeout = 0x0003,
    ServiceNotSupported = 0x0011,
    InvalidServiceArgument = 0x0012,
    GatewayBusy = 0x0013,
    TypeNotSupported = 0x0021,
    ObjectIdNotFound = 0x0022,
    PropertyNotSupported = 0x0023,
    InvalidDataLength = 0x0024,
    PropertyIsReadOnly = 0x0025,
    InvalidData = 0x0026,
    DataTooSmall = 0x0027,
    DataTooBig = 0x0028,
    WritePropertyFailed = 0x0029,
    ReadPropertyFailed = 0x002A,
    AccessDenied = 0x002B,
    ObjectNotSupported = 0x002C,
    MulticastReadNotSupported = 0x002D,
    ObjectPropertyInvalid = 0x002E,
    FileOrDirNotPresent = 0x002F,
    FileCorrupted = 0x0030,
    InvalidShellArg = 0x0081,
}

impl ErrorCode {
    pub fn reason(self) -> &'static str {
        use ErrorCode::*;

        match self {
            InvalidFrame => "INVALID_FRAME",
            DeviceNotFound => "DEVICE_NOT_FOUND",
            ResponseTimeout => "RESPONSE_TIMEOUT",
            ServiceNotSupported => "SERVICE_NOT_SUPPORTED",
            InvalidServiceArgument => "INVALID_SERVICE_ARGUMENT",
            GatewayBusy => "SCOM_ERROR_GATEWAY_BUSY",
            TypeNotSupported => "TYPE_NOT_SUPPORTED",
            ObjectIdNotFound => "OBJECT_ID_NOT_FOUND",
            PropertyNotSupported => "PROPERTY_NOT_SUPPORTED",
            InvalidDataLength => "INVALID_DATA_LENGTH",
            PropertyIsReadOnly => "PROPERTY_IS_READ_ONLY",
            InvalidData => "INVALID_DATA",
            DataTooSmall => "DATA_TOO_SMALL",
            DataTooBig => "DATA_TOO_BIG",
            WritePropertyFailed => "WRITE_PROPERTY_FAILED",
            ReadPropertyFailed => "READ_PROPERTY_FAILED",
            AccessDenied => "ACCESS_DENIED",
            ObjectNotSupported => "SCOM_ERROR_OBJECT_NOT_SUPPORTED",
            MulticastReadNotSupported => "SCOM_ERROR_MULTICAST_READ_NOT_SUPPORTED",
            ObjectPropertyInvalid => "OBJECT_PROPERTY_INVALID",
            FileOrDirNotPresent => "FILE_OR_DIR_NOT_PRESENT",
            FileCorrupted => "FILE_CORRUPTED",
            InvalidShellArg => "INVALID_SHELL_ARG",
        }
    }

    pub fn reason_for(code: u16) -> &'static str {
        Self::try_from(code)
            .map(Self::reason)
            .unwrap_or("UNKNOWN_ERROR")
    }
}
// }}}

#[derive(Debug, Nom)]
#[nom(LittleEndian)]
struct FrameHeader {
    start_byte: u8,
    frame_flags: u8,
    src_addr: u32,
    dst_addr: u32,
    data_length: u16,
}

#[derive(Debug, Nom)]
#[nom(LittleEndian)]
struct ServiceHeader {
    service_flags: u8,
    service_id: u8,
    object_type: u16,
    object_id: u32,
    property_id: u16,
}

/// One Xcom message, request or response.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub frame_flags: u8,
    pub src_addr: u32,
    pub dst_addr: u32,
    pub direction: Direction,
    pub service: ServiceId,
    pub object_type: ObjectType,
    pub object_id: u32,
    pub property: PropertyId,
    pub payload: Option<Value>,
    pub error_code: Option<u16>,
}

impl Frame {
    pub fn request(
        service: ServiceId,
        object_type: ObjectType,
        object_id: u32,
        property: PropertyId,
        payload: Option<Value>,
    ) -> Self {
        Self {
            frame_flags: 0,
            src_addr: DEFAULT_SRC_ADDR,
            dst_addr: DEFAULT_DST_ADDR,
            direction: Direction::Request,
            service,
            object_type,
            object_id,
            property,
            payload,
            error_code: None,
        }
    }

    pub fn with_addresses(mut self, src_addr: u32, dst_addr: u32) -> Self {
        self.src_addr = src_addr;
        self.dst_addr = dst_addr;
        self
    }

    /// The successful reply a device would send to this request.
    pub fn response_to(&self, payload: Option<Value>) -> Self {
        Self {
            src_addr: self.dst_addr,
            dst_addr: self.src_addr,
            direction: Direction::Response,
            payload,
            error_code: None,
            ..self.clone()
        }
    }

    /// The error reply a device would send to this request.
    pub fn error_response_to(&self, code: u16) -> Self {
        Self {
            error_code: Some(code),
            ..self.response_to(None)
        }
    }

    pub fn is_response(&self) -> bool {
        self.direction == Direction::Response
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }

    pub fn error_reason(&self) -> Option<&'static str> {
        self.error_code.map(ErrorCode::reason_for)
    }

    /// Whether `self` is the reply to `request`.
    pub fn corresponds_to(&self, request: &Frame) -> bool {
        self.is_response()
            && self.service == request.service
            && self.object_id == request.object_id
    }

    fn service_flags(&self) -> u8 {
        let mut flags = 0;
        if self.is_response() {
            flags |= FLAG_RESPONSE;
        }
        if self.is_error() {
            flags |= FLAG_ERROR;
        }
        flags
    }

    fn property_data(&self) -> Vec<u8> {
        match (self.error_code, &self.payload) {
            (Some(code), _) => code.to_le_bytes().to_vec(),
            (None, Some(value)) => value.bytes(),
            (None, None) => Vec::new(),
        }
    }

    /// Encodes the frame. Fails when it wouldn't fit in one transport read.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let property_data = self.property_data();

        let size = MIN_FRAME_LEN + property_data.len();
        if size > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size,
                limit: MAX_FRAME_SIZE,
            });
        }

        let mut data = Vec::with_capacity(SERVICE_HEADER_LEN + property_data.len());
        data.push(self.service_flags());
        data.push(self.service.into());
        data.extend_from_slice(&u16::from(self.object_type).to_le_bytes());
        data.extend_from_slice(&self.object_id.to_le_bytes());
        data.extend_from_slice(&u16::from(self.property).to_le_bytes());
        data.extend_from_slice(&property_data);

        let mut r = Vec::with_capacity(HEADER_LEN + data.len() + CHECKSUM_LEN);
        r.push(START_BYTE);
        r.push(self.frame_flags);
        r.extend_from_slice(&self.src_addr.to_le_bytes());
        r.extend_from_slice(&self.dst_addr.to_le_bytes());
        r.extend_from_slice(&(data.len() as u16).to_le_bytes());
        // header checksum skips the start byte
        let header_checksum = checksum(&r[1..]);
        r.extend_from_slice(&header_checksum);
        r.extend_from_slice(&data);
        r.extend_from_slice(&checksum(&data));

        Ok(r)
    }

    pub fn decode(input: &[u8]) -> Result<Self> {
        let len = input.len();
        if len < MIN_FRAME_LEN {
            return Err(Error::TruncatedFrame {
                expected: MIN_FRAME_LEN,
                actual: len,
            });
        }

        let parsed: IResult<&[u8], FrameHeader> = FrameHeader::parse(input);
        let (_, header) = parsed.map_err(|_| Error::TruncatedFrame {
            expected: HEADER_LEN,
            actual: len,
        })?;

        if header.start_byte != START_BYTE {
            return Err(Error::InvalidStartByte(header.start_byte));
        }

        verify("header", &input[1..HEADER_LEN - CHECKSUM_LEN], &input[HEADER_LEN - CHECKSUM_LEN..HEADER_LEN])?;

        let data_length = header.data_length as usize;
        let frame_length = HEADER_LEN + data_length + CHECKSUM_LEN;
        if len < frame_length {
            return Err(Error::TruncatedFrame {
                expected: frame_length,
                actual: len,
            });
        }
        if len > frame_length {
            trace!("ignoring {} trailing bytes after frame", len - frame_length);
        }

        let data = &input[HEADER_LEN..HEADER_LEN + data_length];
        verify("data", data, &input[HEADER_LEN + data_length..frame_length])?;

        if data_length < SERVICE_HEADER_LEN {
            return Err(Error::TruncatedFrame {
                expected: MIN_FRAME_LEN,
                actual: frame_length,
            });
        }

        let parsed: IResult<&[u8], ServiceHeader> = ServiceHeader::parse(data);
        let (property_data, service_header) = parsed.map_err(|_| Error::TruncatedFrame {
            expected: MIN_FRAME_LEN,
            actual: frame_length,
        })?;

        let service = ServiceId::try_from(service_header.service_id).map_err(|_| Error::UnknownField {
            field: "service id",
            value: u32::from(service_header.service_id),
        })?;
        let object_type = ObjectType::try_from(service_header.object_type).map_err(|_| Error::UnknownField {
            field: "object type",
            value: u32::from(service_header.object_type),
        })?;
        let property = PropertyId::try_from(service_header.property_id).map_err(|_| Error::UnknownField {
            field: "property id",
            value: u32::from(service_header.property_id),
        })?;

        let direction = if service_header.service_flags & FLAG_RESPONSE != 0 {
            Direction::Response
        } else {
            Direction::Request
        };

        let mut frame = Self {
            frame_flags: header.frame_flags,
            src_addr: header.src_addr,
            dst_addr: header.dst_addr,
            direction,
            service,
            object_type,
            object_id: service_header.object_id,
            property,
            payload: None,
            error_code: None,
        };

        if service_header.service_flags & FLAG_ERROR != 0 {
            if property_data.len() < 2 {
                return Err(Error::TruncatedFrame {
                    expected: MIN_FRAME_LEN + 2,
                    actual: frame_length,
                });
            }
            frame.error_code = Some(u16::from_le_bytes([property_data[0], property_data[1]]));
        } else if !property_data.is_empty() {
            frame.payload = Some(match payload_kind(object_type, frame.object_id, property) {
                Some(kind) => value::decode(kind, property_data)?,
                None => Value::Raw(property_data.to_vec()),
            });
        }

        Ok(frame)
    }
}

/// Value kind a property of the given object is carried in, if known.
pub fn payload_kind(object_type: ObjectType, object_id: u32, property: PropertyId) -> Option<ValueKind> {
    match (object_type, property) {
        (ObjectType::Info | ObjectType::Parameter, PropertyId::Level) => Some(ValueKind::ShortEnum),
        (ObjectType::Info | ObjectType::Parameter, _) => Registry::lookup(object_id).map(|d| d.kind),
        _ => None,
    }
}

/// Running two-byte sum over `data`: A starts at 0xFF, B accumulates A.
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let (a, b) = data.iter().fold((0xFFu8, 0u8), |(a, b), byte| {
        let a = a.wrapping_add(*byte);
        (a, b.wrapping_add(a))
    });
    [a, b]
}

fn verify(section: &'static str, data: &[u8], received: &[u8]) -> Result<()> {
    let expected = checksum(data);
    if received != expected {
        return Err(Error::ChecksumMismatch {
            section,
            expected,
            actual: [received[0], received[1]],
        });
    }
    Ok(())
}

/// Hex rendering of raw bytes for log lines.
pub struct Hex<'a>(pub &'a [u8]);

impl std::fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
