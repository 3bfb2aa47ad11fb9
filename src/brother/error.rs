//! Error kinds raised while decoding or encoding a Brother raster print
//! stream (§5/§7).

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrotherError {
    #[error("stream switched to a non-raster mode ({0}); this codec only reads raster streams")]
    NonRasterMode(u8),
    #[error("raster line declared {expected} bytes, carried {got}")]
    LineCountMismatch { expected: usize, got: usize },
    #[error("media width was never established before the first raster line")]
    MediaWidthRequired,
    #[error("unexpected end of stream while reading a {0}-byte field")]
    Truncated(&'static str),
    #[error("encountered unknown command byte {0:#04x}")]
    UnknownCommand(u8),
    #[error("no raster lines were found in the stream")]
    EmptyPage,
    #[error(transparent)]
    Bitmap(#[from] crate::bitmap::BitmapError),
}
