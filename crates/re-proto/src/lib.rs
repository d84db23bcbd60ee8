//! Minecraft Java Edition (protocol 340) wire types, packet framing and ids.

pub mod codec;
pub mod compression;
pub mod error;
pub mod frame;
pub mod packet;
pub mod packets;
pub mod types;

pub use error::ProtoError;
pub use frame::FrameCodec;
pub use packet::{Packet, PacketReader, PacketWriter};
