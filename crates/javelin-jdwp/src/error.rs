use std::io;

use thiserror::Error;

use crate::consts::error_name;

#[derive(Debug, Error)]
pub enum JdwpError {
    #[error("i/o failure on the debug channel: {0}")]
    Io(#[from] io::Error),
    #[error("JDWP handshake was rejected by the endpoint")]
    HandshakeFailed,
    #[error("malformed JDWP packet: {0}")]
    Protocol(String),
    #[error("JDWP command failed: {} ({0})", error_name(*.0))]
    VmError(u16),
    #[error("JDWP string was not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl JdwpError {
    /// True for faults of the transport itself, as opposed to errors the
    /// target reported for a well-delivered command.
    pub fn is_transport(&self) -> bool {
        matches!(self, JdwpError::Io(_) | JdwpError::Protocol(_))
    }

    pub fn vm_error_code(&self) -> Option<u16> {
        match self {
            JdwpError::VmError(code) => Some(*code),
            _ => None,
        }
    }
}
