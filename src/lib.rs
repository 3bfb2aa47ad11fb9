//! Converts rendered 1-bit label bitmaps to and from the two thermal
//! label printer wire formats this crate supports — Zebra's ZPL/GRF
//! graphic format and Brother P-touch/QL raster mode — and includes a
//! barcode-quality pass that widens single-pixel white bars so barcodes
//! keep scanning at low print DPI.

pub mod barcode;
pub mod bitmap;
pub mod brother;
pub mod crc;
pub mod external;
pub mod zpl;

pub use barcode::{optimise_barcodes, BarcodeOptions};
pub use bitmap::{Alignment, Bitmap, BitmapError};
pub use external::{FakeRenderer, GhostscriptRenderer, PdfRenderer, RenderError};
