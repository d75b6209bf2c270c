//! Error taxonomy for the sync layer.

use crate::frame::FrameError;
use crate::message::WireError;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong between a caller and the host's store.
///
/// Transport, framing, and codec failures close the connection and fail any
/// outstanding calls with [`Disconnected`](SyncError::Disconnected). The
/// catalogue-level variants ride back inside a `Response` and leave the
/// connection open.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),
    #[error("framing: {0}")]
    Framing(#[from] FrameError),
    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("connection lost with the call outstanding")]
    Disconnected,
    #[error("no response within {0:?}")]
    TimedOut(Duration),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("device is not on the officials or referees roster")]
    Unauthorized,
    #[error("data access: {0}")]
    DataAccess(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Stable code carried in a wire response.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Framing(_) => "framing",
            Self::Codec(_) => "codec",
            Self::Disconnected => "disconnected",
            Self::TimedOut(_) => "timed_out",
            Self::UnknownOperation(_) => "unknown_operation",
            Self::Unauthorized => "unauthorized",
            Self::DataAccess(_) => "data_access",
            Self::Protocol(_) => "protocol",
        }
    }

    /// Rebuild the typed error from a wire response on the caller's side.
    pub fn from_wire(err: WireError) -> Self {
        match err.code.as_str() {
            "unknown_operation" => Self::UnknownOperation(err.message),
            "unauthorized" => Self::Unauthorized,
            "data_access" => Self::DataAccess(err.message),
            _ => Self::Protocol(format!("{}: {}", err.code, err.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip_of_catalogue_errors() {
        for err in [
            SyncError::UnknownOperation("frobnicate".into()),
            SyncError::Unauthorized,
            SyncError::DataAccess("no such bout".into()),
        ] {
            let wire = WireError {
                code: err.code().to_string(),
                message: err.to_string(),
            };
            let back = SyncError::from_wire(wire);
            assert_eq!(back.code(), err.code());
        }
    }

    #[test]
    fn unknown_code_maps_to_protocol() {
        let back = SyncError::from_wire(WireError {
            code: "martian".into(),
            message: "??".into(),
        });
        assert!(matches!(back, SyncError::Protocol(_)));
    }
}
