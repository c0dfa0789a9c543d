//! Common types, enums, and error definitions for the FG detector protocol

use std::fmt;
use thiserror::Error;

/// Result type alias for FG device operations
pub type Result<T> = std::result::Result<T, FgError>;

/// Error types for FG device communication
#[derive(Error, Debug)]
pub enum FgError {
    #[error("No active device session")]
    NoDevice,

    #[error("Scan timed out, device not found")]
    ScanTimeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Service discovery error: {0}")]
    Discovery(String),

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Payload too short: expected {expected} bytes, got {got}")]
    ShortPayload { expected: usize, got: usize },

    #[error("Invalid UTF-8 payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Bluetooth adapter is not powered on")]
    AdapterNotPowered,

    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),
}

/// Connectivity state of the single device session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    Discovering,
    Ready,
    Disconnecting,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Scanning => write!(f, "SCANNING"),
            SessionState::Connecting => write!(f, "CONNECTING"),
            SessionState::Discovering => write!(f, "DISCOVERING"),
            SessionState::Ready => write!(f, "READY"),
            SessionState::Disconnecting => write!(f, "DISCONNECTING"),
            SessionState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Delivery mode for characteristic writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::WithResponse => write!(f, "with response"),
            WriteMode::WithoutResponse => write!(f, "without response"),
        }
    }
}

/// Wire shape of a characteristic value
///
/// Each characteristic has a fixed, protocol-defined width and byte order.
/// The shape is chosen per characteristic by the calling service module,
/// never negotiated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Utf8Text,
    U8,
    U16Be,
    U16Le,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Utf8Text => write!(f, "utf8"),
            ValueShape::U8 => write!(f, "u8"),
            ValueShape::U16Be => write!(f, "u16-be"),
            ValueShape::U16Le => write!(f, "u16-le"),
        }
    }
}

/// A decoded characteristic value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Text(String),
    U8(u8),
    U16(u16),
}

impl TypedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            TypedValue::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            TypedValue::U16(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(s) => write!(f, "{}", s),
            TypedValue::U8(v) => write!(f, "{}", v),
            TypedValue::U16(v) => write!(f, "{}", v),
        }
    }
}
