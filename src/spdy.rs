use std::fmt::{Display, Formatter};

pub mod codec;
pub mod error;
pub mod frames;
pub mod queue;
pub mod stream;
#[cfg(test)]
pub(crate) mod test_utils;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Largest window size the protocol's signed 31-bit delta domain can carry.
pub const MAX_WINDOW_SIZE: i32 = 0x7fff_ffff;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Version {
    Spdy2,
    Spdy3,
}

impl Version {
    pub fn number(self) -> u16 {
        match self {
            Self::Spdy2 => 2,
            Self::Spdy3 => 3,
        }
    }

    /// Per-stream flow control entered the protocol in version 3.
    pub fn has_flow_control(self) -> bool {
        match self {
            Self::Spdy2 => false,
            Self::Spdy3 => true,
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::Spdy3
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let v = match &self {
            Self::Spdy2 => "SPDY/2",
            Self::Spdy3 => "SPDY/3",
        };
        write!(f, "{v}")
    }
}

impl TryFrom<u16> for Version {
    type Error = Error;

    fn try_from(number: u16) -> Result<Self> {
        match number {
            2 => Ok(Self::Spdy2),
            3 => Ok(Self::Spdy3),
            _ => Err(Error::codec(&format!("unsupported spdy version {number}"))),
        }
    }
}
