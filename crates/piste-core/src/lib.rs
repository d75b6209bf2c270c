//! Core types for the piste tournament sync layer.
//!
//! A tournament runs on one host device holding the authoritative store;
//! referee tablets and results kiosks connect over the local network. This
//! crate provides what both roles share: device identity, the wire message
//! envelope, length-prefixed framing, the operation catalogue, the error
//! taxonomy, and the traits at the store/cache boundary. The host and remote
//! role crates build on these.

mod access;
mod api;
mod catalogue;
mod error;
mod frame;
mod identity;
mod message;
mod model;
mod status;
pub mod transport;

pub use access::{CacheBridge, DataAccess, DataAccessError, NoCache, Roster, Store};
pub use api::Operations;
pub use catalogue::{OpKind, lookup, ops, topics};
pub use error::SyncError;
pub use frame::{FrameDecoder, FrameError, MAX_FRAME_LEN, encode};
pub use identity::{DEVICE_CODE_LEN, DeviceId, DeviceIdError, DeviceIdParseError};
pub use message::{Call, WireError, WireMessage};
pub use model::{Bout, Official, Pool, Referee};
pub use status::ConnectionStatus;
