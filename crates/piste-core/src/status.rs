//! Connectivity projection for the UI.
//!
//! The only networking detail any screen may depend on. Everything else
//! (epochs, backoff, registries) stays inside the sync layer.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Host {
        /// Open remote connections.
        peer_count: usize,
        last_error: Option<String>,
    },
    Remote {
        host_reachable: bool,
        last_error: Option<String>,
    },
}

impl ConnectionStatus {
    pub fn idle_host() -> Self {
        Self::Host {
            peer_count: 0,
            last_error: None,
        }
    }

    pub fn idle_remote() -> Self {
        Self::Remote {
            host_reachable: false,
            last_error: None,
        }
    }

    pub fn connected(&self) -> bool {
        match self {
            Self::Host { peer_count, .. } => *peer_count > 0,
            Self::Remote { host_reachable, .. } => *host_reachable,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            Self::Host { last_error, .. } | Self::Remote { last_error, .. } => {
                last_error.as_deref()
            }
        }
    }
}
