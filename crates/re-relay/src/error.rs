//! Relay error types.

use re_nbt::NbtError;
use re_proto::ProtoError;
use thiserror::Error;

/// Failure while walking a single packet body.
///
/// These never leave the core: the ingestion engine and the remapper log
/// them and move on to the next packet.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("embedded NBT: {0}")]
    Nbt(#[from] NbtError),

    #[error("unknown entity metadata type: {0}")]
    UnknownMetadataType(i32),
}

/// Session-level failure. Every variant ends the downstream session.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream connection is closed")]
    UpstreamClosed,

    #[error("downstream connection is closed")]
    DownstreamClosed,

    #[error("downstream fell behind the live feed by {skipped} packets")]
    Lagged { skipped: u64 },
}
