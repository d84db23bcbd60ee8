//! Session mirroring relay core.
//!
//! Keeps a live model of one upstream play session ([`WorldState`]) and lets
//! any number of downstream clients attach to it mid-session: each one gets a
//! synthesized join sequence, then the live packet stream, with the
//! upstream's entity id rewritten to the id it was assigned.

pub mod error;
mod ingest;
pub mod metadata;
pub mod remap;
pub mod session;
mod snapshot;
pub mod world;

#[cfg(test)]
mod testing;

pub use error::{PacketError, RelayError};
pub use remap::Remapper;
pub use session::{Downstream, Identity, Relay, RelayConfig, SessionState};
pub use world::{IngestStats, WorldState};
