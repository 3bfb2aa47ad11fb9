//! A minimal Brother printer driver: wraps one or more bitmaps in the
//! preamble/mode-setting/postamble bytes needed to print them, mirroring
//! `SimpleBrotherPrinter` (§5 supplement).

use crate::bitmap::Bitmap;
use crate::brother::encode::{encode_rasters, print_information, BrotherEncodeOptions};
use crate::brother::error::BrotherError;

const ESC: u8 = 0x1B;

/// Tunables for [`print_pages`]. Field names and bit positions mirror the
/// original driver's `various_mode_settings`/`advanced_mode_settings`
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleBrotherOptions {
    pub auto_cut: bool,
    pub mirror_printing: bool,
    pub half_cut: bool,
    pub chain_printing: bool,
    pub no_buffer_clearing: bool,
    pub special_tape: bool,
    pub draft: bool,
    /// Required when any page in the batch is encoded uncompressed: the
    /// media width, in millimetres, to declare in the print-information
    /// command. Ignored if every page is compressed.
    pub media_width_mm: Option<u8>,
    pub encode: BrotherEncodeOptions,
}

impl Default for SimpleBrotherOptions {
    fn default() -> Self {
        Self {
            auto_cut: true,
            mirror_printing: false,
            half_cut: false,
            chain_printing: false,
            no_buffer_clearing: false,
            special_tape: false,
            draft: false,
            media_width_mm: None,
            encode: BrotherEncodeOptions::default(),
        }
    }
}

/// Emits a complete Brother print job for `pages`. Returns
/// [`BrotherError::MediaWidthRequired`] if any page is encoded
/// uncompressed and `options.media_width_mm` wasn't supplied, since the
/// printer needs the media width declared up front in that case.
pub fn print_pages(pages: &[Bitmap], options: SimpleBrotherOptions) -> Result<Vec<u8>, BrotherError> {
    let mut out = vec![0u8; 100]; // invalidate
    out.extend_from_slice(&[ESC, 0x40]); // initialize
    out.extend_from_slice(&[ESC, 0x69, 0x61, 1]); // raster mode

    // various_mode_settings: bit7=mirror_printing, bit6=auto_cut, rest 0.
    let various_mode_settings =
        (options.mirror_printing as u8) << 7 | (options.auto_cut as u8) << 6;
    out.extend_from_slice(&[ESC, 0x69, 0x4D, various_mode_settings]);

    // advanced_mode_settings: bit7=no_buffer_clearing, bit6=high-res
    // (unused here), bit5=unused, bit4=special_tape,
    // bit3=(0 if chain_printing else 1), bit2=half_cut, bit1=unused,
    // bit0=draft.
    let advanced_mode_settings = (options.no_buffer_clearing as u8) << 7
        | (options.special_tape as u8) << 4
        | ((!options.chain_printing) as u8) << 3
        | (options.half_cut as u8) << 2
        | (options.draft as u8);
    out.extend_from_slice(&[ESC, 0x69, 0x4B, advanced_mode_settings]);

    if !options.encode.compress {
        let media_width_mm = options
            .media_width_mm
            .ok_or(BrotherError::MediaWidthRequired)?;
        let num_lines: u32 = pages.iter().map(|p| p.height() as u32).sum();
        out.extend(print_information(media_width_mm, num_lines));
    }

    for (index, page) in pages.iter().enumerate() {
        out.extend(encode_rasters(page, options.encode)?);
        let is_last = index + 1 == pages.len();
        if is_last {
            out.push(0x1A); // print and feed/eject
        } else {
            out.push(0x0C); // print, no feed; keep the head engaged
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brother::decode::decode_pages;

    #[test]
    fn print_single_page_roundtrips() {
        let bitmap = Bitmap::new(16, 1, vec![0xFF, 0x00]).unwrap();
        let options = SimpleBrotherOptions {
            encode: BrotherEncodeOptions {
                head_width_bytes: 2,
                ..BrotherEncodeOptions::default()
            },
            ..Default::default()
        };
        let stream = print_pages(&[bitmap], options).unwrap();
        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].buffer(), &[0xFF, 0x00]);
    }

    #[test]
    fn multi_page_batch_uses_form_feed_between_pages_regardless_of_chain_printing() {
        // `chain_printing` only flips a bit in `advanced_mode_settings`; the
        // per-page terminator is unconditional: 0x0C for all but the last
        // page, 0x1A for the last, whether or not chain_printing is set.
        let a = Bitmap::new(16, 1, vec![0xFF, 0x00]).unwrap();
        let b = Bitmap::new(16, 1, vec![0x00, 0xFF]).unwrap();
        let options = SimpleBrotherOptions {
            chain_printing: false,
            encode: BrotherEncodeOptions {
                head_width_bytes: 2,
                ..BrotherEncodeOptions::default()
            },
            ..Default::default()
        };
        let stream = print_pages(&[a, b], options).unwrap();
        assert_eq!(stream.iter().filter(|&&b| b == 0x0C).count(), 1);
        assert_eq!(stream.last(), Some(&0x1A));
        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn uncompressed_batch_without_media_width_is_rejected() {
        let bitmap = Bitmap::new(16, 1, vec![0xFF, 0x00]).unwrap();
        let options = SimpleBrotherOptions {
            encode: BrotherEncodeOptions {
                head_width_bytes: 2,
                compress: false,
                ..BrotherEncodeOptions::default()
            },
            ..Default::default()
        };
        assert_eq!(
            print_pages(&[bitmap], options),
            Err(BrotherError::MediaWidthRequired)
        );
    }

    #[test]
    fn uncompressed_batch_with_media_width_roundtrips() {
        let bitmap = Bitmap::new(16, 1, vec![0xFF, 0x00]).unwrap();
        let options = SimpleBrotherOptions {
            media_width_mm: Some(62),
            encode: BrotherEncodeOptions {
                head_width_bytes: 2,
                compress: false,
                ..BrotherEncodeOptions::default()
            },
            ..Default::default()
        };
        let stream = print_pages(&[bitmap], options).unwrap();
        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0xFF, 0x00]);
    }

    #[test]
    fn various_mode_settings_bit_layout() {
        let options = SimpleBrotherOptions {
            mirror_printing: true,
            auto_cut: true,
            encode: BrotherEncodeOptions {
                head_width_bytes: 2,
                ..BrotherEncodeOptions::default()
            },
            ..Default::default()
        };
        let bitmap = Bitmap::new(16, 1, vec![0xFF, 0x00]).unwrap();
        let stream = print_pages(&[bitmap], options).unwrap();
        let pos = stream
            .windows(3)
            .position(|w| w == [ESC, 0x69, 0x4D])
            .unwrap();
        assert_eq!(stream[pos + 3], 0b1100_0000);
    }

    #[test]
    fn advanced_mode_settings_defaults_set_the_non_chaining_bit() {
        let bitmap = Bitmap::new(16, 1, vec![0xFF, 0x00]).unwrap();
        let options = SimpleBrotherOptions {
            encode: BrotherEncodeOptions {
                head_width_bytes: 2,
                ..BrotherEncodeOptions::default()
            },
            ..Default::default()
        };
        let stream = print_pages(&[bitmap], options).unwrap();
        let pos = stream
            .windows(3)
            .position(|w| w == [ESC, 0x69, 0x4B])
            .unwrap();
        // chain_printing defaults to false, so bit 3 (the "not chained") is set.
        assert_eq!(stream[pos + 3], 0b0000_1000);
    }
}
