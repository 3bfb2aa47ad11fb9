//! Decodes `~DG`, `~DY`, and `^GF` graphic commands into [`GrfRecord`]s
//! (§4.4).

use base64::Engine as _;
use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::bitmap::Bitmap;
use crate::crc::crc_ccitt_hex;
use crate::zpl::error::ZplError;
use crate::zpl::record::GrfRecord;
use crate::zpl::rle;

/// Decodes a single tokenised ZPL command. Returns `Ok(None)` for commands
/// that carry no graphic payload, or a recognised-but-skippable `~DY`
/// payload (a non-graphic format such as a downloaded font).
pub fn decode_command(token: &str) -> Result<Option<GrfRecord>, ZplError> {
    if let Some(rest) = token.strip_prefix("~DG") {
        decode_dg(rest).map(Some)
    } else if let Some(rest) = token.strip_prefix("~DY") {
        decode_dy(rest)
    } else if let Some(rest) = token.strip_prefix("^GF") {
        decode_gf(rest).map(Some)
    } else {
        Ok(None)
    }
}

/// `~DG<mem>:<name>.GRF,<filesize>,<width_bytes>,<payload>`. The memory
/// bank letter is accepted but not otherwise significant to decoding.
fn decode_dg(rest: &str) -> Result<GrfRecord, ZplError> {
    let without_bank = strip_memory_bank(rest)?;
    let mut parts = without_bank.splitn(4, ',');
    let name_ext = parts
        .next()
        .ok_or_else(|| ZplError::Malformed("missing `~DG` name".into()))?;
    let name = name_ext
        .strip_suffix(".GRF")
        .ok_or_else(|| ZplError::Malformed(format!("expected `.GRF` suffix in {name_ext:?}")))?;
    let filesize = parse_usize(parts.next(), "filesize")?;
    let width_bytes = parse_usize(parts.next(), "width_bytes")?;
    let payload = parts
        .next()
        .ok_or_else(|| ZplError::Malformed("missing `~DG` payload".into()))?;

    build_record(name, filesize, width_bytes, payload)
}

/// `~DY<mem>:<name>.<ext>,<fmt>,<filesize>,<width_bytes>,<payload>`.
fn decode_dy(rest: &str) -> Result<Option<GrfRecord>, ZplError> {
    let without_bank = strip_memory_bank(rest)?;
    let mut parts = without_bank.splitn(5, ',');
    let name_ext = parts
        .next()
        .ok_or_else(|| ZplError::Malformed("missing `~DY` name".into()))?;
    let name = name_ext
        .rsplit_once('.')
        .map(|(name, _ext)| name)
        .unwrap_or(name_ext);
    let fmt = parts
        .next()
        .and_then(|s| s.chars().next())
        .ok_or_else(|| ZplError::Malformed("missing `~DY` format".into()))?;

    // Non-graphic formats (fonts etc.) are out of scope; skip silently.
    if !matches!(fmt, 'B' | 'G' | 'P' | 'H') {
        return Ok(None);
    }
    if fmt != 'G' {
        return Err(ZplError::UnsupportedGraphicFormat(fmt));
    }

    let filesize = parse_usize(parts.next(), "filesize")?;
    let width_bytes = parse_usize(parts.next(), "width_bytes")?;
    let payload = parts
        .next()
        .ok_or_else(|| ZplError::Malformed("missing `~DY` payload".into()))?;

    build_record(name, filesize, width_bytes, payload).map(Some)
}

/// `^GF<kind>,<bin_byte_count>,<graphic_byte_count>,<bytes_per_row>,<payload>`.
fn decode_gf(rest: &str) -> Result<GrfRecord, ZplError> {
    let mut parts = rest.splitn(5, ',');
    let kind = parts
        .next()
        .and_then(|s| s.chars().next())
        .ok_or_else(|| ZplError::Malformed("missing `^GF` kind".into()))?;
    if kind != 'A' {
        return Err(ZplError::UnsupportedCompression(kind));
    }
    let _bin_byte_count = parse_usize(parts.next(), "bin_byte_count")?;
    let graphic_byte_count = parse_usize(parts.next(), "graphic_byte_count")?;
    let width_bytes = parse_usize(parts.next(), "bytes_per_row")?;
    let payload = parts
        .next()
        .ok_or_else(|| ZplError::Malformed("missing `^GF` payload".into()))?;

    // `^GF` has no dedicated name field; synthesise one since GrfRecord
    // always carries one. Callers addressing a single inline raster by
    // `^GF` don't rely on this name.
    build_record("GF", graphic_byte_count, width_bytes, payload)
}

/// Strips the `<mem>:` memory bank prefix (`~DG`/`~DY` use a single-letter
/// bank, documented in practice as `R`, but any letter is accepted).
fn strip_memory_bank(rest: &str) -> Result<&str, ZplError> {
    let (bank, tail) = rest
        .split_once(':')
        .ok_or_else(|| ZplError::Malformed("missing memory bank separator `:`".into()))?;
    if bank.len() != 1 || !bank.chars().next().unwrap().is_ascii_alphabetic() {
        return Err(ZplError::Malformed(format!(
            "expected a single-letter memory bank, got {bank:?}"
        )));
    }
    Ok(tail)
}

fn parse_usize(field: Option<&str>, what: &str) -> Result<usize, ZplError> {
    field
        .ok_or_else(|| ZplError::Malformed(format!("missing {what}")))?
        .parse()
        .map_err(|_| ZplError::Malformed(format!("invalid {what}")))
}

fn build_record(
    name: &str,
    filesize: usize,
    width_bytes: usize,
    payload: &str,
) -> Result<GrfRecord, ZplError> {
    let name = GrfRecord::validate_name(name)?;
    let data = decode_payload(payload, width_bytes)?;

    if data.len() != filesize {
        return Err(ZplError::BadFileSize {
            expected: filesize,
            got: data.len(),
        });
    }

    let height = if width_bytes == 0 {
        0
    } else {
        filesize / width_bytes
    };
    let bitmap = Bitmap::new(width_bytes * 8, height.max(1), data)?;

    Ok(GrfRecord {
        name,
        filesize,
        width_bytes,
        bitmap,
    })
}

fn decode_payload(payload: &str, width_bytes: usize) -> Result<Vec<u8>, ZplError> {
    if let Some(b64) = payload.strip_prefix(":Z64:") {
        decode_base64_envelope(b64, true)
    } else if let Some(b64) = payload.strip_prefix(":B64:") {
        decode_base64_envelope(b64, false)
    } else {
        decode_ascii_hex_rle(payload, width_bytes)
    }
}

/// `body` is everything after the `:Z64:`/`:B64:` marker, still carrying
/// its trailing `:<4-hex-crc>`.
fn decode_base64_envelope(body: &str, deflated: bool) -> Result<Vec<u8>, ZplError> {
    if body.len() < 5 {
        return Err(ZplError::Malformed("base64 envelope too short".into()));
    }
    let split_at = body.len() - 5;
    let b64_text = &body[..split_at];
    let crc_field = &body[split_at + 1..];

    let computed = crc_ccitt_hex(b64_text.as_bytes());
    if !computed.eq_ignore_ascii_case(crc_field) {
        return Err(ZplError::BadCrc {
            expected: crc_field.to_string(),
            computed,
        });
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(b64_text)
        .map_err(|e| ZplError::Base64(e.to_string()))?;

    if deflated {
        let mut inflated = Vec::new();
        ZlibDecoder::new(&decoded[..])
            .read_to_end(&mut inflated)
            .map_err(|e| ZplError::Deflate(e.to_string()))?;
        Ok(inflated)
    } else {
        Ok(decoded)
    }
}

fn decode_ascii_hex_rle(payload: &str, width_bytes: usize) -> Result<Vec<u8>, ZplError> {
    let expanded = rle::expand(payload);
    let row_chars = width_bytes * 2;

    let mut rows: Vec<String> = Vec::new();
    let mut row = String::new();

    for c in expanded.chars() {
        match c {
            ':' => {
                let previous = rows.last().cloned().ok_or(ZplError::NoPreviousRow)?;
                rows.push(previous);
                continue;
            }
            ',' => {
                // A comma right after a row that just auto-committed at
                // full width is a no-op separator, not a request to pad an
                // empty row into a spurious blank one.
                if row.is_empty() {
                    continue;
                }
                while row.len() < row_chars {
                    row.push('0');
                }
            }
            _ => row.push(c),
        }
        if row.len() == row_chars {
            rows.push(std::mem::take(&mut row));
        }
    }

    let mut bytes = Vec::with_capacity(rows.len() * width_bytes);
    for row in rows {
        for pair in row.as_bytes().chunks(2) {
            let hex_pair = std::str::from_utf8(pair).unwrap();
            let byte = u8::from_str_radix(hex_pair, 16)
                .map_err(|_| ZplError::InvalidHex(hex_pair.chars().next().unwrap_or('?')))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}
