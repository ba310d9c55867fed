use super::frames::{Frame, HeaderBlock, StatusCode, StreamId, FLAG_FIN};
use super::{Error, Result, Version};
use bytes::Bytes;

const CONTROL_BIT: u16 = 0x8000;
const STREAM_ID_MASK: u32 = 0x7fff_ffff;

const RST_STREAM: u16 = 0x3;
const HEADERS: u16 = 0x8;
const WINDOW_UPDATE: u16 = 0x9;

/// Serializes the frames a stream produces and parses inbound wire bytes.
/// Injected into each stream at construction; implementations must be
/// shareable across the connection's threads.
pub trait FrameCodec: Send + Sync {
    fn version(&self) -> Version;
    fn serialize(&self, frame: &Frame) -> Vec<u8>;
    fn parse(&self, bytes: &[u8]) -> Result<Frame>;
}

/// Default codec speaking the SPDY v2/v3 frame grammar. Header blocks are
/// serialized uncompressed; compression belongs to the session layer.
pub struct WireCodec {
    version: Version,
}

impl WireCodec {
    pub fn new(version: Version) -> Self {
        Self { version }
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(Version::default())
    }
}

impl FrameCodec for WireCodec {
    fn version(&self) -> Version {
        self.version
    }

    fn serialize(&self, frame: &Frame) -> Vec<u8> {
        match frame {
            Frame::Data {
                stream_id,
                payload,
                fin,
            } => self.data_frame(*stream_id, payload, *fin),
            Frame::Headers {
                stream_id,
                headers,
                fin,
            } => {
                let flags = match fin {
                    true => FLAG_FIN,
                    false => 0x0,
                };
                self.control_frame(HEADERS, flags, self.headers_payload(*stream_id, headers))
            }
            Frame::RstStream { stream_id, status } => {
                let mut payload = (stream_id & STREAM_ID_MASK).to_be_bytes().to_vec();
                payload.extend(status.to_be_bytes());
                self.control_frame(RST_STREAM, 0x0, payload)
            }
            Frame::WindowUpdate { stream_id, delta } => {
                let mut payload = (stream_id & STREAM_ID_MASK).to_be_bytes().to_vec();
                payload.extend((delta & STREAM_ID_MASK).to_be_bytes());
                self.control_frame(WINDOW_UPDATE, 0x0, payload)
            }
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<Frame> {
        if bytes.len() < 8 {
            return Err(Error::codec("truncated frame header"));
        }
        let length = u32::from_be_bytes([0x00, bytes[5], bytes[6], bytes[7]]) as usize;
        let flags = bytes[4];
        let payload = bytes
            .get(8..8 + length)
            .ok_or_else(|| Error::codec("truncated frame payload"))?;

        if bytes[0] & 0x80 == 0 {
            let stream_id = read_u32(bytes, 0)? & STREAM_ID_MASK;
            return Ok(Frame::Data {
                stream_id,
                payload: Bytes::copy_from_slice(payload),
                fin: flags & FLAG_FIN != 0,
            });
        }

        let version = Version::try_from(u16::from_be_bytes([bytes[0], bytes[1]]) & !CONTROL_BIT)?;
        if version != self.version {
            return Err(Error::protocol(&format!(
                "expected {}, received {version}",
                self.version
            )));
        }
        let kind = u16::from_be_bytes([bytes[2], bytes[3]]);
        match kind {
            RST_STREAM => self.parse_rst_stream(payload),
            HEADERS => self.parse_headers(payload, flags),
            WINDOW_UPDATE => self.parse_window_update(payload),
            _ => Err(Error::codec("unsupported control frame")),
        }
    }
}

impl WireCodec {
    fn data_frame(&self, stream_id: StreamId, payload: &Bytes, fin: bool) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + payload.len());
        bytes.extend((stream_id & STREAM_ID_MASK).to_be_bytes());
        bytes.push(match fin {
            true => FLAG_FIN,
            false => 0x0,
        });
        bytes.extend(payload_length(payload.len()));
        bytes.extend_from_slice(payload);

        bytes
    }

    fn control_frame(&self, kind: u16, flags: u8, payload: Vec<u8>) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + payload.len());
        bytes.extend((CONTROL_BIT | self.version.number()).to_be_bytes());
        bytes.extend(kind.to_be_bytes());
        bytes.push(flags);
        bytes.extend(payload_length(payload.len()));
        bytes.extend(payload);

        bytes
    }

    fn headers_payload(&self, stream_id: StreamId, headers: &HeaderBlock) -> Vec<u8> {
        let mut bytes = (stream_id & STREAM_ID_MASK).to_be_bytes().to_vec();
        match self.version {
            // v2 carries two unused bytes after the stream id and 16-bit
            // counts and lengths in the name/value block.
            Version::Spdy2 => {
                bytes.extend([0x0, 0x0]);
                bytes.extend((headers.len() as u16).to_be_bytes());
                for (name, value) in headers {
                    bytes.extend((name.len() as u16).to_be_bytes());
                    bytes.extend(name.as_bytes());
                    bytes.extend((value.len() as u16).to_be_bytes());
                    bytes.extend(value.as_bytes());
                }
            }
            Version::Spdy3 => {
                bytes.extend((headers.len() as u32).to_be_bytes());
                for (name, value) in headers {
                    bytes.extend((name.len() as u32).to_be_bytes());
                    bytes.extend(name.as_bytes());
                    bytes.extend((value.len() as u32).to_be_bytes());
                    bytes.extend(value.as_bytes());
                }
            }
        }

        bytes
    }

    fn parse_rst_stream(&self, payload: &[u8]) -> Result<Frame> {
        if payload.len() != 8 {
            return Err(Error::codec("malformed rst_stream frame"));
        }
        let stream_id = read_u32(payload, 0)? & STREAM_ID_MASK;
        let status = StatusCode::try_from(read_u32(payload, 4)?)?;

        Ok(Frame::RstStream { stream_id, status })
    }

    fn parse_window_update(&self, payload: &[u8]) -> Result<Frame> {
        if payload.len() != 8 {
            return Err(Error::codec("malformed window_update frame"));
        }
        let stream_id = read_u32(payload, 0)? & STREAM_ID_MASK;
        let delta = read_u32(payload, 4)? & STREAM_ID_MASK;

        Ok(Frame::WindowUpdate { stream_id, delta })
    }

    fn parse_headers(&self, payload: &[u8], flags: u8) -> Result<Frame> {
        let stream_id = read_u32(payload, 0)? & STREAM_ID_MASK;
        let mut at = 4;
        let count = match self.version {
            Version::Spdy2 => {
                at += 2;
                let count = read_u16(payload, at)? as usize;
                at += 2;
                count
            }
            Version::Spdy3 => {
                let count = read_u32(payload, at)? as usize;
                at += 4;
                count
            }
        };
        let mut headers = HeaderBlock::new();
        for _ in 0..count {
            let name = self.read_string(payload, &mut at)?;
            let value = self.read_string(payload, &mut at)?;
            headers.insert(name, value);
        }
        if at != payload.len() {
            return Err(Error::codec("malformed header block"));
        }

        Ok(Frame::Headers {
            stream_id,
            headers,
            fin: flags & FLAG_FIN != 0,
        })
    }

    fn read_string(&self, payload: &[u8], at: &mut usize) -> Result<String> {
        let length = match self.version {
            Version::Spdy2 => {
                let length = read_u16(payload, *at)? as usize;
                *at += 2;
                length
            }
            Version::Spdy3 => {
                let length = read_u32(payload, *at)? as usize;
                *at += 4;
                length
            }
        };
        let raw = payload
            .get(*at..*at + length)
            .ok_or_else(|| Error::codec("truncated header block"))?;
        *at += length;

        String::from_utf8(raw.to_vec())
            .map_err(|_| Error::codec("header block contained invalid utf-8"))
    }
}

fn payload_length(length: usize) -> [u8; 3] {
    debug_assert!(length <= 0xff_ffff);
    let bytes = (length as u32).to_be_bytes();

    [bytes[1], bytes[2], bytes[3]]
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let bytes = bytes
        .get(at..at + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .ok_or_else(|| Error::codec("truncated frame payload"))?;

    Ok(u32::from_be_bytes(bytes))
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let bytes = bytes
        .get(at..at + 2)
        .and_then(|b| <[u8; 2]>::try_from(b).ok())
        .ok_or_else(|| Error::codec("truncated frame payload"))?;

    Ok(u16::from_be_bytes(bytes))
}
