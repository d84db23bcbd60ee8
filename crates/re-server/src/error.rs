use re_proto::ProtoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("connection closed during login")]
    ConnectionClosed,

    #[error("upstream refused login: {0}")]
    Disconnected(String),

    #[error("upstream requires online-mode authentication")]
    EncryptionRequested,

    #[error("unexpected packet 0x{id:02x} during {phase}")]
    UnexpectedPacket { phase: &'static str, id: i32 },

    #[error("unsupported protocol version {0}")]
    UnsupportedProtocol(i32),

    #[error("invalid handshake next state {0}")]
    InvalidNextState(i32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
