//! Error kinds raised while decoding or encoding ZPL GRF commands (§7).

use crate::bitmap::BitmapError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZplError {
    #[error("GRF name must be 1-8 alphanumeric characters, got {0:?}")]
    InvalidName(String),
    #[error("base64 payload CRC mismatch: expected {expected}, computed {computed}")]
    BadCrc { expected: String, computed: String },
    #[error("decoded payload was {got} bytes, declared filesize was {expected}")]
    BadFileSize { expected: usize, got: usize },
    #[error("`~DY` graphic format `{0}` is not supported")]
    UnsupportedGraphicFormat(char),
    #[error("`^GF` compression kind `{0}` is not supported")]
    UnsupportedCompression(char),
    #[error("`:` with no previous row to repeat")]
    NoPreviousRow,
    #[error("malformed GRF command: {0}")]
    Malformed(String),
    #[error("invalid hex digit in payload: {0:?}")]
    InvalidHex(char),
    #[error(transparent)]
    Bitmap(#[from] BitmapError),
    #[error("base64 decode failed: {0}")]
    Base64(String),
    #[error("DEFLATE decompression failed: {0}")]
    Deflate(String),
}
