//! Encodes a [`Bitmap`] into a Brother raster print stream (§5.4):
//! fit the bitmap to the print head width, then emit one raster line
//! command per row (wire order is bottom-to-top), compressed with
//! PackBits.

use crate::bitmap::{Alignment, Bitmap};
use crate::brother::error::BrotherError;
use crate::brother::packbits::pack;

const ESC: u8 = 0x1B;

/// Selects the endianness of the raster-line length prefix; the decoder
/// accepts either, so this is purely an encoder preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterCommand {
    /// `G <lo> <hi>`.
    LittleEndian,
    /// `g <hi> <lo>`.
    BigEndian,
}

impl RasterCommand {
    fn byte(self) -> u8 {
        match self {
            RasterCommand::LittleEndian => 0x47,
            RasterCommand::BigEndian => 0x67,
        }
    }
}

/// Tunables affecting how a bitmap is fitted to the print head before
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrotherEncodeOptions {
    /// Target row width in bytes (the print head's native width). If the
    /// bitmap is narrower or wider, it is centred and padded/cropped.
    pub head_width_bytes: usize,
    /// Use TIFF PackBits compression (`M 2`) rather than raw rows (`M 0`).
    pub compress: bool,
    /// Which raster-line command (and length endianness) to emit.
    pub raster_command: RasterCommand,
}

impl Default for BrotherEncodeOptions {
    fn default() -> Self {
        Self {
            head_width_bytes: 90, // 720 dots, a common 62mm QL head width
            compress: true,
            raster_command: RasterCommand::LittleEndian,
        }
    }
}

/// Encodes `bitmap` as the raster-line portion of a Brother print stream
/// (without the invalidate/initialize preamble or the print-and-eject
/// command; see [`crate::brother::driver::print_pages`] for a complete
/// job). Rows are emitted in wire order, which is bottom-to-top; if that
/// leaves a blank row first, it is patched into a width-bearing raster
/// command instead of a bare `Z`, matching the source encoder's
/// "width-detection patch".
pub fn encode_rasters(bitmap: &Bitmap, options: BrotherEncodeOptions) -> Result<Vec<u8>, BrotherError> {
    let fitted = bitmap.pad_or_crop_to_width_bytes(options.head_width_bytes, Alignment::Centre);
    let width_bytes = fitted.width_bytes();
    if width_bytes < 2 {
        return Err(BrotherError::Truncated("head width"));
    }

    let mut out = Vec::new();
    out.push(b'M');
    out.push(if options.compress { 2 } else { 0 });

    let mut rows: Vec<Vec<u8>> = fitted.rows().map(|r| r.to_vec()).collect();
    rows.reverse(); // wire order is bottom-to-top

    // A blank row normally becomes a bare `Z` command, which carries no
    // width information. If that lands on the very first wire row, the
    // decoder would have nothing to learn the page width from, so that
    // one case is patched into an explicit raster command that unpacks
    // to `width_bytes` zero bytes instead — the same blank row, but
    // width-bearing. Any other row, blank or not, is unaffected.
    let first_is_blank = rows.first().map_or(false, |row| row.iter().all(|&b| b == 0));

    for (idx, row) in rows.iter().enumerate() {
        let is_blank = row.iter().all(|&b| b == 0);
        if idx == 0 && first_is_blank {
            let control = 0xFFu8.wrapping_sub((width_bytes - 2) as u8);
            emit_raster(&mut out, options.raster_command, &[control, 0x00]);
        } else if is_blank {
            out.push(b'Z');
        } else if options.compress {
            let packed = pack(row);
            emit_raster(&mut out, options.raster_command, &packed);
        } else {
            emit_raster(&mut out, options.raster_command, row);
        }
    }
    Ok(out)
}

fn emit_raster(out: &mut Vec<u8>, command: RasterCommand, data: &[u8]) {
    out.push(command.byte());
    match command {
        RasterCommand::LittleEndian => {
            out.push((data.len() & 0xFF) as u8);
            out.push(((data.len() >> 8) & 0xFF) as u8);
        }
        RasterCommand::BigEndian => {
            out.push(((data.len() >> 8) & 0xFF) as u8);
            out.push((data.len() & 0xFF) as u8);
        }
    }
    out.extend_from_slice(data);
}

/// Prepends the invalidate/initialize/raster-mode preamble expected before
/// any raster command.
pub fn preamble() -> Vec<u8> {
    let mut out = vec![0u8; 100];
    out.extend_from_slice(&[ESC, 0x40]);
    out.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
    out
}

/// Builds the `ESC i z` print-information command, required ahead of any
/// raster that will be sent uncompressed so the printer knows the total
/// line count and media width up front.
pub fn print_information(media_width_mm: u8, num_lines: u32) -> Vec<u8> {
    let mut out = vec![ESC, 0x69, 0x7A, 0x84, 0x00, media_width_mm, 0x00];
    out.extend_from_slice(&num_lines.to_le_bytes());
    out.extend_from_slice(&[0x00, 0x00]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brother::decode::decode_pages;

    fn opts(head_width_bytes: usize, compress: bool) -> BrotherEncodeOptions {
        BrotherEncodeOptions {
            head_width_bytes,
            compress,
            raster_command: RasterCommand::LittleEndian,
        }
    }

    #[test]
    fn encode_then_decode_roundtrips() {
        let bitmap = Bitmap::new(16, 2, vec![0xFF, 0xFF, 0x00, 0x00]).unwrap();
        let mut stream = preamble();
        stream.extend(encode_rasters(&bitmap, opts(2, true)).unwrap());
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0xFF, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn uncompressed_rows_roundtrip() {
        let bitmap = Bitmap::new(16, 1, vec![0b1010_1010, 0x0F]).unwrap();
        let mut stream = preamble();
        stream.extend(encode_rasters(&bitmap, opts(2, false)).unwrap());
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0b1010_1010, 0x0F]);
    }

    #[test]
    fn blank_first_row_still_carries_correct_content_after_roundtrip() {
        // Wire order is bottom-to-top, so the bitmap's last row (blank
        // here) lands first on the wire and gets width-patched; the real
        // content (the bitmap's top row) must still survive intact.
        let bitmap = Bitmap::new(16, 2, vec![0xFF, 0x00, 0x00, 0x00]).unwrap();
        let mut stream = preamble();
        stream.extend(encode_rasters(&bitmap, opts(2, true)).unwrap());
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), bitmap.buffer());
    }

    #[test]
    fn big_endian_raster_command_roundtrips() {
        let bitmap = Bitmap::new(16, 2, vec![0x12, 0x34, 0x56, 0x78]).unwrap();
        let options = BrotherEncodeOptions {
            head_width_bytes: 2,
            compress: true,
            raster_command: RasterCommand::BigEndian,
        };
        let mut stream = preamble();
        stream.extend(encode_rasters(&bitmap, options).unwrap());
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), bitmap.buffer());
    }

    #[test]
    fn head_width_narrower_than_two_bytes_is_rejected() {
        let bitmap = Bitmap::new(8, 1, vec![0xFF]).unwrap();
        assert_eq!(
            encode_rasters(&bitmap, opts(1, true)),
            Err(BrotherError::Truncated("head width"))
        );
    }
}
