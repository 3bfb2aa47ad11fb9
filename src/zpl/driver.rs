//! A minimal ZPL printer driver: wraps one or more GRF records in the
//! handful of commands needed to print them, mirroring
//! `SimpleZebraPrinter.print` (§4 supplement — not named by the distilled
//! module list, but present throughout the original driver and needed for
//! anything beyond producing a raw GRF payload).
//!
//! Each raster is downloaded standalone (`~DG...`, not wrapped in a
//! `^XA`/`^XZ` form), then printed via its own `^XA ... ^XZ` form, and
//! finally deleted from printer memory via a separate `^XA^ID...^XZ`
//! form. The three steps are concatenated across every raster in the
//! batch, in order.

use crate::zpl::encode::{encode_payload, CompressionLevel};
use crate::zpl::record::GrfRecord;

/// Tunables for [`print_pages`]. Defaults match the original driver's
/// defaults: tear-off media mode, gap/notch sensing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleZplOptions {
    /// Media tracking mode for `^MN` (`Y` = gap/notch, `N` = continuous,
    /// `M` = mark).
    pub media_tracking: MediaTracking,
    /// Print mode for `^MM` (tear-off, peel-off, cutter, ...).
    pub print_mode: PrintMode,
    /// Label home position (`^LH`), in dots.
    pub label_home: (u32, u32),
    /// Compression level used for each embedded GRF payload.
    pub compression: CompressionLevel,
}

impl Default for SimpleZplOptions {
    fn default() -> Self {
        Self {
            media_tracking: MediaTracking::GapNotch,
            print_mode: PrintMode::TearOff,
            label_home: (0, 0),
            compression: CompressionLevel::Level3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTracking {
    Continuous,
    GapNotch,
    Mark,
}

impl MediaTracking {
    fn code(self) -> char {
        match self {
            MediaTracking::Continuous => 'N',
            MediaTracking::GapNotch => 'Y',
            MediaTracking::Mark => 'M',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    TearOff,
    PeelOff,
    Cutter,
    Rewind,
    Applicator,
}

impl PrintMode {
    fn code(self) -> char {
        match self {
            PrintMode::TearOff => 'T',
            PrintMode::PeelOff => 'P',
            PrintMode::Cutter => 'C',
            PrintMode::Rewind => 'R',
            PrintMode::Applicator => 'A',
        }
    }
}

/// Emits a complete ZPL print job for `records`: one `~DG` download per
/// raster, each followed by its own print form, followed by a delete form
/// for every raster in the batch.
pub fn print_pages(records: &[GrfRecord], options: SimpleZplOptions) -> String {
    let mut out = String::new();
    let (lh_x, lh_y) = options.label_home;

    for record in records {
        let payload = encode_payload(&record.bitmap, options.compression);
        out.push_str(&format!(
            "~DGR:{name}.GRF,{filesize},{width_bytes},{payload}",
            name = record.name,
            filesize = record.filesize,
            width_bytes = record.width_bytes,
        ));

        out.push_str("^XA");
        out.push_str(&format!("^MM{}\n", options.print_mode.code()));
        out.push_str(&format!("^MN{}\n", options.media_tracking.code()));
        out.push_str(&format!("^LH{lh_x},{lh_y}\n"));
        out.push_str(&format!("^FO{lh_x},{lh_y}\n"));
        out.push_str(&format!("^XGR:{}.GRF,1,1\n", record.name));
        out.push_str("^XZ");
    }

    for record in records {
        out.push_str("^XA");
        out.push_str(&format!("^IDR:{}.GRF\n", record.name));
        out.push_str("^FS\n");
        out.push_str("^XZ");
    }

    out
}

/// Convenience wrapper around [`print_pages`] for the common single-label
/// case.
pub fn print_label(record: &GrfRecord, options: SimpleZplOptions) -> String {
    print_pages(std::slice::from_ref(record), options)
}
