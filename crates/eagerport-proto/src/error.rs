/// Errors from the custom-op blob codec.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown element tag {0}")]
    UnknownTag(u8),

    #[error("expected {expected} elements, found {got}")]
    ElementCount { expected: usize, got: usize },

    #[error("element {position} should be a {expected}")]
    ElementKind {
        position: usize,
        expected: &'static str,
    },

    #[error("string element is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("{0} trailing bytes after the last element")]
    TrailingBytes(usize),

    #[error("element of {0} bytes does not fit a u32 length prefix")]
    TooLarge(usize),

    #[error("embedded NodeDef failed to decode")]
    NodeDef(#[from] prost::DecodeError),
}

/// A parse failure in NodeDef text, pointing at the byte where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("text format error at byte {offset}: {message}")]
pub struct TextFormatError {
    pub offset: usize,
    pub message: String,
}

impl TextFormatError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}
