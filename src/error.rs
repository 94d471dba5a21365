use std::io;

use failure::Fail;

use crate::protocol::ResponseStatus;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),

    #[fail(display = "Timeout waiting for reader response")]
    Timeout,

    #[fail(display = "Reader returned {:?} (0x{:04x})", _0, _1)]
    Command(ResponseStatus, u16),

    #[fail(display = "Reader returned unknown status 0x{:04x}", _0)]
    UnknownStatus(u16),

    #[fail(display = "Protocol error: {}", _0)]
    Protocol(String),

    #[fail(display = "Invalid reader URI '{}': {}", _0, _1)]
    InvalidUri(String, String),

    #[fail(display = "Reader is not connected")]
    NotConnected,

    #[fail(display = "Unsupported parameter: {}", _0)]
    UnsupportedParam(String),

    #[fail(display = "Parameter is read-only: {}", _0)]
    ReadOnlyParam(String),

    #[fail(display = "Wrong value type for parameter {}", _0)]
    WrongType(String),

    #[fail(display = "Reader doesn't support any regions")]
    NoSupportedRegions,

    #[fail(display = "No baud rate in {:?} produced a response", _0)]
    BaudProbeFailed(Vec<u32>),

    #[fail(display = "{}", _0)]
    Program(String),
}

impl Error {
    /// Whether the failure means the reader did not answer in time.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<String> for Error {
    fn from(e: String) -> Error {
        Error::Program(e)
    }
}

impl From<u16> for Error {
    fn from(code: u16) -> Error {
        match ResponseStatus::from_code(code) {
            Some(status) => Error::Command(status, code),
            None => Error::UnknownStatus(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        assert!(Error::Timeout.is_timeout());
        assert!(Error::from(io::Error::new(io::ErrorKind::TimedOut, "slow")).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
        assert!(!Error::from(io::Error::new(io::ErrorKind::NotFound, "gone")).is_timeout());
    }

    #[test]
    fn test_timeout_message() {
        assert!(Error::Timeout.to_string().contains("Timeout"));
    }

    #[test]
    fn test_status_code() {
        match Error::from(0x0101u16) {
            Error::Command(ResponseStatus::InvalidOpcode, 0x0101) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Error::from(0x1234u16) {
            Error::UnknownStatus(0x1234) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
