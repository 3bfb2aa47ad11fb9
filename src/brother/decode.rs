//! Parses a raw Brother P-touch/QL print stream into one [`Bitmap`] per
//! page (§4.6). The stream is a sequence of single- and multi-byte
//! commands; raster lines accumulate into the current page until a print
//! command flushes it.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;

use crate::bitmap::Bitmap;
use crate::brother::error::BrotherError;
use crate::brother::packbits::unpack;

const ESC: u8 = 0x1B;

/// Compression mode selected by the `M` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Tiff,
}

/// Decodes every page found in `stream`, in order. `skip_undocumented`
/// maps an unrecognised `ESC i <op>` byte to the number of argument bytes
/// following it to skip; the default (`{0x55: 15}`) matches the one
/// undocumented command observed in practice.
pub fn decode_pages(stream: &[u8]) -> Result<Vec<Bitmap>, BrotherError> {
    decode_pages_with(stream, &[(0x55, 15)])
}

/// As [`decode_pages`] but with a caller-supplied undocumented-command
/// skip table instead of the built-in default.
pub fn decode_pages_with(
    stream: &[u8],
    skip_undocumented: &[(u8, usize)],
) -> Result<Vec<Bitmap>, BrotherError> {
    let mut pages = Vec::new();
    let mut rows: Vec<Vec<u8>> = Vec::new();
    let mut compression = Compression::Tiff; // "Compression is on by default"
    let mut high_res = false;
    let mut lines_seen: usize = 0;
    let mut lines_expected: usize = 0;

    let mut i = 0;
    while i < stream.len() {
        match stream[i] {
            // Raster line, little-endian length: G <lo> <hi> <data...>.
            0x47 => {
                i = decode_raster_line(stream, i, compression, LittleEndian::read_u16, &mut rows)?;
            }
            // Raster line, big-endian length: g <hi> <lo> <data...>.
            0x67 => {
                i = decode_raster_line(stream, i, compression, BigEndian::read_u16, &mut rows)?;
            }
            // Blank raster line: Z. A no-op before any row has established
            // the page width.
            0x5A if !rows.is_empty() => {
                let width = rows[0].len();
                rows.push(vec![0u8; width]);
                i += 1;
            }
            // Print page, no feed, or print page and feed/eject.
            b @ (0x0C | 0x1A) if !rows.is_empty() => {
                lines_seen += rows.len();
                let bitmap = flush_page(&mut rows, high_res)?;
                pages.push(bitmap);
                let _ = b;
                i += 1;
            }
            // Compression mode: M <n>.
            0x4D => {
                let n = byte_at(stream, i + 1)?;
                compression = if n == 0x02 {
                    Compression::Tiff
                } else {
                    Compression::None
                };
                i += 2;
            }
            // Invalidate (null padding): always skips 100 bytes total,
            // regardless of whether the following bytes are actually zero.
            0x00 => {
                i += 100;
            }
            ESC => {
                i = decode_escape(stream, i, &mut high_res, &mut lines_expected, skip_undocumented)?;
            }
            other => {
                warn!("unknown Brother raster command byte {other:#04x}, skipping");
                i += 1;
            }
        }
    }

    if !rows.is_empty() {
        lines_seen += rows.len();
        let bitmap = flush_page(&mut rows, high_res)?;
        pages.push(bitmap);
    }

    if lines_expected != 0 && lines_seen != lines_expected {
        return Err(BrotherError::LineCountMismatch {
            expected: lines_expected,
            got: lines_seen,
        });
    }

    Ok(pages)
}

fn decode_raster_line(
    stream: &[u8],
    at: usize,
    compression: Compression,
    read_len: fn(&[u8]) -> u16,
    rows: &mut Vec<Vec<u8>>,
) -> Result<usize, BrotherError> {
    require_len(stream, at, 3)?;
    let len = read_len(&stream[at + 1..at + 3]) as usize;
    require_len(stream, at, 3 + len)?;
    let data = &stream[at + 3..at + 3 + len];
    let decoded = match compression {
        Compression::Tiff => unpack(data),
        Compression::None => data.to_vec(),
    };
    rows.push(decoded);
    Ok(at + 3 + len)
}

/// Dispatches a `ESC ...` sequence starting at `stream[at]`. Returns the
/// index of the next unconsumed byte.
fn decode_escape(
    stream: &[u8],
    at: usize,
    high_res: &mut bool,
    lines_expected: &mut usize,
    skip_undocumented: &[(u8, usize)],
) -> Result<usize, BrotherError> {
    let next = byte_at(stream, at + 1)?;
    if next == 0x40 {
        // Initialise: ESC @.
        return Ok(at + 2);
    }
    if next != 0x69 {
        warn!("unknown Brother escape sequence starting with {next:#04x}, skipping");
        return Ok(at + 2);
    }

    let cmd = byte_at(stream, at + 2)?;
    match cmd {
        // Switch automatic status notification mode / page-cut numbering /
        // various mode settings / status information request: all 1-byte
        // args, 4 bytes total.
        0x21 | 0x41 | 0x4D | 0x53 => {
            require_len(stream, at, 4)?;
            Ok(at + 4)
        }
        // Advanced mode settings: bit 6 of the flags byte selects
        // high-resolution printing.
        0x4B => {
            let flags = byte_at(stream, at + 3)?;
            *high_res = flags & 0x40 != 0;
            Ok(at + 4)
        }
        // Switch dynamic command mode: only raster mode (0x01) is
        // supported; ESC/P (0x00) and P-touch Template (0x02) are not.
        0x61 => {
            let mode = byte_at(stream, at + 3)?;
            if mode != 0x01 {
                return Err(BrotherError::NonRasterMode(mode));
            }
            Ok(at + 4)
        }
        // Specify margin amount (feed amount): 2-byte arg, 5 bytes total.
        0x64 => {
            require_len(stream, at, 5)?;
            Ok(at + 5)
        }
        // Print information command: a 10-byte payload; bytes 4..8 of it
        // (relative to the command byte) carry a little-endian line count
        // that accumulates into `lines_expected`.
        0x7A => {
            require_len(stream, at, 13)?;
            *lines_expected += LittleEndian::read_u32(&stream[at + 7..at + 11]) as usize;
            Ok(at + 13)
        }
        other => {
            if let Some(&(_, skip)) = skip_undocumented.iter().find(|(op, _)| *op == other) {
                require_len(stream, at, 3 + skip)?;
                Ok(at + 3 + skip)
            } else {
                // One argument byte beyond the `ESC i <cmd>` header, matching
                // the source's 15-bytes-of-arg convention for its one known
                // undocumented command (0x55): "bytes of arg" always counts
                // from just past this 3-byte header.
                require_len(stream, at, 4)?;
                warn!("encountered undocumented Brother command: {other:#04x}");
                Ok(at + 4)
            }
        }
    }
}

/// Commits the accumulated rows (bottom-to-top wire order) as one
/// [`Bitmap`], reversing them into top-to-bottom order first and
/// stretching columns 2x if high-resolution mode doubled the vertical
/// density.
fn flush_page(rows: &mut Vec<Vec<u8>>, high_res: bool) -> Result<Bitmap, BrotherError> {
    let width_bytes = rows.first().map(|r| r.len()).ok_or(BrotherError::EmptyPage)?;
    let mut collected: Vec<Vec<u8>> = rows.drain(..).collect();
    collected.reverse();

    for row in &mut collected {
        if row.len() != width_bytes {
            row.resize(width_bytes, 0);
        }
    }

    let (final_width_bytes, final_rows) = if high_res {
        (width_bytes * 2, collected.iter().map(|r| stretch_row(r)).collect())
    } else {
        (width_bytes, collected)
    };

    let height = final_rows.len();
    let mut buffer = Vec::with_capacity(final_width_bytes * height);
    for row in final_rows {
        buffer.extend_from_slice(&row);
    }
    Ok(Bitmap::new(final_width_bytes * 8, height, buffer)?)
}

/// Doubles every bit in `row` horizontally (each input bit becomes two
/// adjacent output bits), matching high-resolution mode's doubled
/// vertical density so the printed aspect ratio is preserved.
fn stretch_row(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len() * 2);
    for &byte in row {
        let mut doubled: u16 = 0;
        for bit_index in 0..8 {
            let bit = (byte >> (7 - bit_index)) & 1;
            if bit == 1 {
                doubled |= 0b11 << ((7 - bit_index) * 2);
            }
        }
        out.push((doubled >> 8) as u8);
        out.push((doubled & 0xFF) as u8);
    }
    out
}

fn byte_at(stream: &[u8], at: usize) -> Result<u8, BrotherError> {
    stream.get(at).copied().ok_or(BrotherError::Truncated("command"))
}

fn require_len(stream: &[u8], at: usize, len: usize) -> Result<(), BrotherError> {
    if stream.len() < at + len {
        Err(BrotherError::Truncated("command"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brother::packbits::pack;

    fn raster_command_le(row: &[u8]) -> Vec<u8> {
        let mut out = vec![0x47, row.len() as u8, (row.len() >> 8) as u8];
        out.extend_from_slice(row);
        out
    }

    fn raster_command_be(row: &[u8]) -> Vec<u8> {
        let mut out = vec![0x67, (row.len() >> 8) as u8, row.len() as u8];
        out.extend_from_slice(row);
        out
    }

    #[test]
    fn decodes_single_uncompressed_page_reversing_wire_order() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x40]); // initialize
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]); // raster mode
        stream.extend_from_slice(&[0x4D, 0x00]); // compression off
        stream.extend_from_slice(&raster_command_le(&[0xFF])); // bottom row
        stream.extend_from_slice(&raster_command_le(&[0x00])); // top row
        stream.push(0x1A); // print and eject

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages.len(), 1);
        // Wire order is bottom-to-top; the decoded bitmap reverses it so
        // row 0 is the top of the label.
        assert_eq!(pages[0].buffer(), &[0x00, 0xFF]);
        assert_eq!(pages[0].height(), 2);
    }

    #[test]
    fn big_endian_raster_command_is_accepted() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&raster_command_be(&[0xAB]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0xAB]);
    }

    #[test]
    fn decodes_compressed_rows() {
        let packed = pack(&[0xAA, 0xAA, 0xAA, 0xAA]);
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x02]); // TIFF compression
        stream.extend_from_slice(&raster_command_le(&packed));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0xAA, 0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn zero_line_before_any_row_is_a_no_op() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.push(0x5A);
        stream.extend_from_slice(&raster_command_le(&[0xFF]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0xFF]);
    }

    #[test]
    fn zero_line_after_width_established_is_blank_row() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&raster_command_le(&[0xFF]));
        stream.push(0x5A);
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        // Bottom row (wire order) was the 0xFF raster line, top row the
        // zero line; after reversal row 0 (top) is all-zero.
        assert_eq!(pages[0].buffer(), &[0x00, 0xFF]);
    }

    #[test]
    fn non_raster_mode_is_rejected() {
        let stream = vec![ESC, 0x69, 0x61, 0];
        assert_eq!(decode_pages(&stream), Err(BrotherError::NonRasterMode(0)));
    }

    #[test]
    fn multiple_pages_are_split_on_print_commands() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&raster_command_le(&[0xFF]));
        stream.push(0x0C);
        stream.extend_from_slice(&raster_command_le(&[0x00]));
        stream.push(0x1A);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].buffer(), &[0xFF]);
        assert_eq!(pages[1].buffer(), &[0x00]);
    }

    #[test]
    fn unknown_command_byte_is_skipped_not_fatal() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.push(0xFE); // unknown
        stream.extend_from_slice(&raster_command_le(&[0xFF]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0xFF]);
    }

    #[test]
    fn invalidate_skips_exactly_100_bytes() {
        let mut stream = vec![0x00];
        stream.extend(std::iter::repeat(0xFFu8).take(99)); // not actually zero
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&raster_command_le(&[0x11]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0x11]);
    }

    #[test]
    fn line_count_mismatch_is_rejected() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        // Declare 3 expected lines via the print-information command.
        let mut print_info = vec![ESC, 0x69, 0x7A];
        print_info.extend_from_slice(&[0; 4]); // n1..n4
        print_info.extend_from_slice(&3u32.to_le_bytes()); // n5..n8: line count
        print_info.extend_from_slice(&[0; 2]); // n9..n10
        stream.extend_from_slice(&print_info);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&raster_command_le(&[0xFF])); // only 1 line seen
        stream.push(0x1A);

        assert_eq!(
            decode_pages(&stream),
            Err(BrotherError::LineCountMismatch { expected: 3, got: 1 })
        );
    }

    #[test]
    fn undocumented_escape_with_known_skip_length_is_consumed_whole() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        let mut undocumented = vec![ESC, 0x69, 0x55];
        undocumented.extend(std::iter::repeat(0u8).take(15));
        stream.extend_from_slice(&undocumented);
        stream.extend_from_slice(&raster_command_le(&[0x22]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0x22]);
    }

    #[test]
    fn unrecognised_escape_command_consumes_one_arg_byte_past_the_header() {
        // `0xFE` isn't in `skip_undocumented`, so it takes the default path:
        // one argument byte beyond the 3-byte `ESC i <cmd>` header, i.e. 4
        // bytes total, leaving the stream aligned for the raster line after it.
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&[ESC, 0x69, 0xFE, 0x00]);
        stream.extend_from_slice(&raster_command_le(&[0x33]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].buffer(), &[0x33]);
    }

    #[test]
    fn high_res_stretches_columns_not_rows() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[ESC, 0x69, 0x61, 1]);
        stream.extend_from_slice(&[ESC, 0x69, 0x4B, 0x40]); // bit 6 set
        stream.extend_from_slice(&[0x4D, 0x00]);
        stream.extend_from_slice(&raster_command_le(&[0b1010_0000]));
        stream.push(0x0C);

        let pages = decode_pages(&stream).unwrap();
        assert_eq!(pages[0].height(), 1);
        assert_eq!(pages[0].width(), 16);
        assert_eq!(pages[0].buffer(), &[0b1100_1100, 0b0000_0000]);
    }
}
