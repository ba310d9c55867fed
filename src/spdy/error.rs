use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
}

impl Error {
    pub fn new(message: &str, kind: ErrorKind) -> Self {
        Self {
            message: message.to_string(),
            kind,
        }
    }

    pub fn codec(message: &str) -> Self {
        Self::new(message, ErrorKind::Codec)
    }

    pub fn protocol(message: &str) -> Self {
        Self::new(message, ErrorKind::Protocol)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error: {}\nKind: {:?}", self.message, self.kind)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    /// Wire bytes could not be parsed into a frame.
    Codec,
    /// The frame was well-formed but not legal for this protocol version.
    Protocol,
}
