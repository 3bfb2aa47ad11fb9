//! Encodes a [`Bitmap`] back into a GRF payload at one of three
//! compression levels (§4.5):
//!
//! - Level 1 (`:B64:`): plain base64 plus trailing CRC.
//! - Level 2: ASCII-hex, run-length compressed, with trailing-white
//!   trimming and `:` row deduplication.
//! - Level 3 (`:Z64:`): DEFLATE, then base64, then trailing CRC.

use base64::Engine as _;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use crate::bitmap::Bitmap;
use crate::crc::crc_ccitt_hex;
use crate::zpl::rle;

/// Compression level selecting the GRF payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// `:B64:` — base64 only.
    Level1,
    /// ASCII-hex with run-length compression.
    #[default]
    Level2,
    /// `:Z64:` — DEFLATE then base64.
    Level3,
}

/// Encodes `bitmap` into a GRF payload string (everything after the last
/// comma in a `~DG` command) at the requested compression level.
pub fn encode_payload(bitmap: &Bitmap, level: CompressionLevel) -> String {
    match level {
        CompressionLevel::Level1 => encode_base64_envelope(bitmap.buffer(), false),
        CompressionLevel::Level2 => encode_ascii_hex_rle(bitmap),
        CompressionLevel::Level3 => encode_base64_envelope(bitmap.buffer(), true),
    }
}

fn encode_base64_envelope(data: &[u8], deflate: bool) -> String {
    let marker = if deflate { ":Z64:" } else { ":B64:" };
    let payload_bytes = if deflate {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("in-memory write");
        encoder.finish().expect("in-memory finish")
    } else {
        data.to_vec()
    };
    let b64 = base64::engine::general_purpose::STANDARD.encode(payload_bytes);
    let crc = crc_ccitt_hex(b64.as_bytes());
    format!("{marker}{b64}:{crc}")
}

fn encode_ascii_hex_rle(bitmap: &Bitmap) -> String {
    let rows: Vec<String> = bitmap.hex_rows().collect();

    // Every row's hex (trimmed and compressed) carries its own trailing
    // `,` so the decoder knows to pad-and-commit it even when trimming
    // left it short of the full row width — including the very last row,
    // which has no following row to supply that separator implicitly. A
    // row identical to the previous *unique* row is instead replaced
    // outright with `:`, which the decoder commits on its own without
    // needing a trailing comma.
    let mut out = String::new();
    let mut previous: Option<&str> = None;
    for row in &rows {
        let trimmed = trim_trailing_zeros(row);
        if Some(trimmed.as_str()) == previous.map(trim_trailing_zeros).as_deref() {
            out.push(':');
        } else {
            out.push_str(&rle::compress(&trimmed));
            out.push(',');
        }
        previous = Some(row.as_str());
    }
    out
}

/// Trims trailing `"00"` byte-pairs from a hex row, leaving at least one
/// hex digit so an all-zero row still compresses as `"00"` rather than an
/// empty string.
fn trim_trailing_zeros(row: &str) -> String {
    let bytes = row.as_bytes();
    let mut end = bytes.len();
    while end >= 2 && &bytes[end - 2..end] == b"00" {
        end -= 2;
    }
    if end == 0 {
        "00".to_string()
    } else {
        row[..end].to_string()
    }
}
