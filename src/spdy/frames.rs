use super::{Error, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub type StreamId = u32;
pub type HeaderBlock = BTreeMap<String, String>;

pub const FLAG_FIN: u8 = 0x1;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq)]
pub enum FrameKind {
    Data,
    Headers,
    RstStream,
    WindowUpdate,
}

/// One protocol message, described before serialization. Immutable once
/// built; the codec is the only component that branches on the variant.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Frame {
    Data {
        stream_id: StreamId,
        payload: Bytes,
        fin: bool,
    },
    Headers {
        stream_id: StreamId,
        headers: HeaderBlock,
        fin: bool,
    },
    RstStream {
        stream_id: StreamId,
        status: StatusCode,
    },
    WindowUpdate {
        stream_id: StreamId,
        delta: u32,
    },
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Data { .. } => FrameKind::Data,
            Self::Headers { .. } => FrameKind::Headers,
            Self::RstStream { .. } => FrameKind::RstStream,
            Self::WindowUpdate { .. } => FrameKind::WindowUpdate,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Data { stream_id, .. }
            | Self::Headers { stream_id, .. }
            | Self::RstStream { stream_id, .. }
            | Self::WindowUpdate { stream_id, .. } => *stream_id,
        }
    }

    pub fn is_fin(&self) -> bool {
        match self {
            Self::Data { fin, .. } | Self::Headers { fin, .. } => *fin,
            Self::RstStream { .. } | Self::WindowUpdate { .. } => false,
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data { stream_id, payload, fin } => write!(
                f,
                "Data {{ stream: {stream_id}, len: {}, fin: {fin} }}",
                payload.len()
            ),
            Self::Headers { stream_id, headers, fin } => write!(
                f,
                "Headers {{ stream: {stream_id}, count: {}, fin: {fin} }}",
                headers.len()
            ),
            Self::RstStream { stream_id, status } => {
                write!(f, "RstStream {{ stream: {stream_id}, status: {status:?} }}")
            }
            Self::WindowUpdate { stream_id, delta } => {
                write!(f, "WindowUpdate {{ stream: {stream_id}, delta: {delta} }}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq)]
#[repr(u32)]
pub enum StatusCode {
    ProtocolError = 0x1,
    InvalidStream = 0x2,
    RefusedStream = 0x3,
    UnsupportedVersion = 0x4,
    Cancel = 0x5,
    InternalError = 0x6,
    FlowControlError = 0x7,
    StreamInUse = 0x8,
    StreamAlreadyClosed = 0x9,
    InvalidCredentials = 0xa,
    FrameTooLarge = 0xb,
}

impl StatusCode {
    pub fn to_be_bytes(self) -> [u8; 4] {
        (self as u32).to_be_bytes()
    }
}

impl TryFrom<u32> for StatusCode {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        let status = match value {
            0x1 => Self::ProtocolError,
            0x2 => Self::InvalidStream,
            0x3 => Self::RefusedStream,
            0x4 => Self::UnsupportedVersion,
            0x5 => Self::Cancel,
            0x6 => Self::InternalError,
            0x7 => Self::FlowControlError,
            0x8 => Self::StreamInUse,
            0x9 => Self::StreamAlreadyClosed,
            0xa => Self::InvalidCredentials,
            0xb => Self::FrameTooLarge,
            _ => return Err(Error::codec("received invalid status code")),
        };

        Ok(status)
    }
}

impl TryFrom<[u8; 4]> for StatusCode {
    type Error = Error;

    fn try_from(bytes: [u8; 4]) -> Result<Self> {
        Self::try_from(u32::from_be_bytes(bytes))
    }
}
