use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbtError {
    /// The buffer ran out in the middle of a tag.
    #[error("tag truncated: needed {needed} bytes, {available} left")]
    Truncated { needed: usize, available: usize },

    #[error("root tag has kind {0}, only compounds may appear at the root")]
    RootNotCompound(u8),

    #[error("no tag kind has id {0}")]
    BadTagKind(u8),

    #[error("tag string is not UTF-8")]
    BadString,

    #[error("tags nested more than {0} deep")]
    TooDeep(usize),

    #[error("length prefix {0} is negative")]
    NegativeLength(i32),
}
