//! Widens 1-pixel-wide white bars inside dense barcode regions so they
//! survive being printed at low DPI (§6). A region is found by scanning
//! rows for maximal horizontal black runs, grouping the rows that share an
//! identical run span; within an accepted group, a single column is
//! sampled down the span and its rewritten pixel sequence is painted back
//! across the whole span width.

use std::collections::HashMap;

use crate::bitmap::Bitmap;

/// Tunables controlling what counts as a barcode-like region and how
/// aggressively it's rewritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarcodeOptions {
    /// Minimum length, in pixels, of a row's horizontal black run for that
    /// row to contribute a candidate span.
    pub min_bar_height: usize,
    /// Minimum number of rows sharing an identical span for that group to
    /// be treated as a barcode region.
    pub min_bar_count: usize,
    /// Maximum gap, in rows, between rows sharing a span, to still group
    /// them into the same region.
    pub max_gap_size: usize,
    /// A region is only rewritten if its row density (matching rows over
    /// the row index range they span) falls within
    /// `[min_percent_white, max_percent_white]`.
    pub min_percent_white: f64,
    pub max_percent_white: f64,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            min_bar_height: 20,
            min_bar_count: 100,
            max_gap_size: 30,
            min_percent_white: 0.2,
            max_percent_white: 0.8,
        }
    }
}

/// Applies barcode-bar widening to `bitmap`, checking both the bitmap as
/// given (catches bars that run vertically) and a copy rotated 90 degrees
/// clockwise (catches bars that run horizontally), then rotates the
/// second pass's result back so both passes compose onto the same
/// dimensions as the input.
pub fn optimise_barcodes(bitmap: &Bitmap, options: BarcodeOptions) -> Bitmap {
    let upright = optimise_pass(bitmap, options);

    // rotate_90_cw/rotate_90_ccw only compose to the identity when both
    // dimensions are byte-aligned; pad the height out before rotating and
    // crop it back afterwards so an odd-height bitmap still round-trips.
    let padded_height = ((upright.height() + 7) / 8) * 8;
    let padded = pad_height(&upright, padded_height);
    let rotated = padded.rotate_90_cw();
    let rotated_optimised = optimise_pass(&rotated, options);
    let rotated_back = rotated_optimised.rotate_90_ccw();
    crop_height(&rotated_back, upright.height())
}

fn pad_height(bitmap: &Bitmap, new_height: usize) -> Bitmap {
    let width_bytes = bitmap.width_bytes();
    let mut buffer = bitmap.buffer().to_vec();
    buffer.resize(width_bytes * new_height, 0);
    Bitmap::new(bitmap.width(), new_height, buffer).expect("only height changed")
}

fn crop_height(bitmap: &Bitmap, new_height: usize) -> Bitmap {
    let width_bytes = bitmap.width_bytes();
    let buffer = bitmap.buffer()[..width_bytes * new_height].to_vec();
    Bitmap::new(bitmap.width(), new_height, buffer).expect("only height changed")
}

/// Detects and rewrites barcode regions, treating `bitmap` as a set of
/// rows (so this pass catches bars that run vertically: a bar shows up as
/// the same horizontal span of black pixels, repeated down many rows).
fn optimise_pass(bitmap: &Bitmap, options: BarcodeOptions) -> Bitmap {
    let width = bitmap.width();
    let height = bitmap.height();

    let mut rows: Vec<Vec<bool>> = (0..height)
        .map(|y| (0..width).map(|x| bitmap.pixel(x, y)).collect())
        .collect();

    // Spans are visited in first-seen order so that if two accepted
    // groups ever overlap, the later one paints over the earlier one, the
    // same order a plain insertion-ordered map would produce.
    let mut span_order: Vec<(usize, usize)> = Vec::new();
    let mut bars: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (y, row) in rows.iter().enumerate() {
        for span in row_runs(row, options.min_bar_height) {
            let seen_at = bars.entry(span).or_insert_with(|| {
                span_order.push(span);
                Vec::new()
            });
            seen_at.push(y);
        }
    }

    let mut groups: Vec<((usize, usize), Vec<usize>)> = Vec::new();
    for span in span_order {
        let seen_at = &bars[&span];
        let mut group: Vec<usize> = Vec::new();
        for &row_index in seen_at {
            if let Some(&last) = group.last() {
                if row_index - last > options.max_gap_size {
                    groups.push((span, std::mem::take(&mut group)));
                }
            }
            group.push(row_index);
        }
        if !group.is_empty() {
            groups.push((span, group));
        }
    }

    for (span, seen_at) in groups {
        if seen_at.len() < options.min_bar_count {
            continue;
        }
        let first = seen_at[0];
        let last = *seen_at.last().unwrap();
        let density = seen_at.len() as f64 / (last - first) as f64;
        if density < options.min_percent_white || density > options.max_percent_white {
            continue;
        }

        let sampled: Vec<bool> = (first..=last).map(|y| rows[y][span.0]).collect();
        let rewritten = rewrite_column(&sampled);

        for (offset, y) in (first..=last).enumerate() {
            let value = rewritten[offset];
            for x in span.0..span.1 {
                rows[y][x] = value;
            }
        }
    }

    let width_bytes = bitmap.width_bytes();
    let mut buffer = vec![0u8; width_bytes * height];
    for (y, row) in rows.iter().enumerate() {
        for (x, &pixel) in row.iter().enumerate() {
            if pixel {
                buffer[y * width_bytes + x / 8] |= 1 << (7 - (x % 8));
            }
        }
    }
    Bitmap::new(bitmap.width(), height, buffer).expect("same dimensions as source bitmap")
}

/// Finds every maximal run of `true` of length at least `min_bar_height`
/// in `row`, returning each as a half-open `(start, end)` column span.
fn row_runs(row: &[bool], min_bar_height: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < row.len() {
        if row[i] {
            let start = i;
            while i < row.len() && row[i] {
                i += 1;
            }
            if i - start >= min_bar_height {
                spans.push((start, i));
            }
        } else {
            i += 1;
        }
    }
    spans
}

/// Rewrites a single column's pixel run: widens every isolated 1-pixel
/// white gap between two black pixels to 2 pixels, then shortens the
/// column back to its original length by trimming one pixel off the
/// longest remaining black run, so the barcode's total height is
/// unchanged.
fn rewrite_column(column: &[bool]) -> Vec<bool> {
    let original_len = column.len();

    if !contains_101(column) {
        return column.to_vec();
    }

    let mut bits: Vec<bool> = column.to_vec();

    // "110" -> "100": the trailing pixel of a black run of 2+ right before
    // a white gap turns white, shifting the edge left by one and widening
    // the gap without changing the column's length.
    let mut i = 0;
    let mut widened = Vec::with_capacity(bits.len() + 4);
    while i < bits.len() {
        if i + 2 < bits.len() && bits[i] && bits[i + 1] && !bits[i + 2] {
            widened.push(true);
            widened.push(false);
            widened.push(false);
            i += 3;
        } else {
            widened.push(bits[i]);
            i += 1;
        }
    }
    bits = widened;

    // If still too short a gap anywhere ("101" meaning a single white
    // pixel flanked by black with nothing absorbed above), expand to
    // "1001" by inserting an extra black pixel, then shorten elsewhere.
    let mut i = 0;
    let mut re_widened = Vec::with_capacity(bits.len() + 4);
    while i < bits.len() {
        if i + 2 < bits.len() && bits[i] && !bits[i + 1] && bits[i + 2] {
            re_widened.push(true);
            re_widened.push(false);
            re_widened.push(false);
            re_widened.push(true);
            i += 3;
        } else {
            re_widened.push(bits[i]);
            i += 1;
        }
    }
    bits = re_widened;

    shorten_to_length(bits, original_len)
}

/// Whether `bits` contains a single white pixel flanked by black on both
/// sides anywhere (a "101" triple) — the §4.9 gate on whether a column is
/// touched at all.
fn contains_101(bits: &[bool]) -> bool {
    bits.windows(3).any(|w| w[0] && !w[1] && w[2])
}

/// Finds the run that shortening should sacrifice from next: any run of
/// black pixels outranks any run of white pixels regardless of length
/// (widening only ever eats into white, so length is given back from
/// black); among runs of the same colour the longest wins; ties break on
/// the leftmost (topmost) run.
fn find_best_run(bits: &[bool]) -> Option<(usize, usize, bool)> {
    let mut best: Option<(usize, usize, bool)> = None;
    let mut i = 0;
    while i < bits.len() {
        let mut j = i + 1;
        while j < bits.len() && bits[j] == bits[i] {
            j += 1;
        }
        let len = j - i;
        let value = bits[i];
        let better = match best {
            None => true,
            Some((_, best_len, best_value)) => {
                if value != best_value {
                    value
                } else {
                    len > best_len
                }
            }
        };
        if better {
            best = Some((i, len, value));
        }
        i = j;
    }
    best
}

/// Trims `bits` back down to `target_len` by repeatedly removing one
/// pixel from [`find_best_run`]'s pick until the length matches.
fn shorten_to_length(mut bits: Vec<bool>, target_len: usize) -> Vec<bool> {
    while bits.len() > target_len {
        let (start, _, _) = find_best_run(&bits).expect("non-empty while len > target_len >= 0");
        bits.remove(start);
    }
    bits
}
