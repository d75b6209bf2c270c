//! Host role for the piste tournament sync layer.
//!
//! The host owns the authoritative store. This crate dispatches inbound
//! requests against it ([`RequestRouter`]), keeps the broadcast set of open
//! connections ([`Registry`]), serves remotes over framed TCP ([`Host`]), and
//! gives the host's own screens the same call surface the remotes see
//! ([`LocalSession`]).

mod listener;
mod local;
mod memory;
mod registry;
mod router;

pub use listener::Host;
pub use local::LocalSession;
pub use memory::MemoryStore;
pub use registry::{ConnectionId, Registry};
pub use router::RequestRouter;
