//! Remote role for the piste tournament sync layer.
//!
//! A referee tablet or results kiosk connects to the host with a
//! [`ConnectionSupervisor`] and talks to the store through the
//! [`ClientSession`] it hands out. The session implements the same
//! [`Operations`](piste_core::Operations) surface the host's local session
//! does, so screens are written once for both roles.

mod session;
mod supervisor;

pub use session::ClientSession;
pub use supervisor::{ConnectionSupervisor, LinkState, SupervisorConfig};
