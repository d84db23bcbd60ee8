use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    /// A read wanted more bytes than the packet has left.
    #[error("packet truncated: wanted {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("VarInt runs past five bytes")]
    VarIntTooLong,

    #[error("string is not UTF-8")]
    BadString,

    #[error("length prefix {0} is negative")]
    NegativeLength(i32),

    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("zlib: {0}")]
    Zlib(#[from] std::io::Error),

    #[error("frame declared {declared} uncompressed bytes but inflated to {actual}")]
    SizeMismatch { declared: usize, actual: usize },
}
