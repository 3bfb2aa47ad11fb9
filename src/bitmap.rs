//! The one canonical representation of a decoded label: a 1-bit raster,
//! MSB-first within each byte, `1` meaning ink (black). Derived views (hex
//! rows, bit rows, an inverted-sense byte view) are computed on demand by
//! iterators rather than cached, per the "one canonical representation"
//! guidance for re-architecting the source's three lazily cached views.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BitmapError {
    #[error("width must be a positive multiple of 8, got {0}")]
    InvalidWidth(usize),
    #[error("height must be positive, got {0}")]
    InvalidHeight(usize),
    #[error("buffer length {got} does not match width/height ({expected})")]
    LengthMismatch { expected: usize, got: usize },
}

/// A 1-bit monochrome raster. `1` = ink.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bitmap {
    width: usize,
    height: usize,
    buffer: Vec<u8>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.buffer.len())
            .finish()
    }
}

impl Bitmap {
    /// Builds a bitmap from a row-major, MSB-first, `1=ink` byte buffer.
    /// `width` must be a positive multiple of 8 and `buffer.len()` must
    /// equal `height * width_bytes()`.
    pub fn new(width: usize, height: usize, buffer: Vec<u8>) -> Result<Self, BitmapError> {
        if width == 0 || width % 8 != 0 {
            return Err(BitmapError::InvalidWidth(width));
        }
        if height == 0 {
            return Err(BitmapError::InvalidHeight(height));
        }
        let expected = (width / 8) * height;
        if buffer.len() != expected {
            return Err(BitmapError::LengthMismatch {
                expected,
                got: buffer.len(),
            });
        }
        Ok(Self {
            width,
            height,
            buffer,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row width in bytes (`width / 8`).
    pub fn width_bytes(&self) -> usize {
        self.width / 8
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Iterates rows as byte slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.buffer.chunks(self.width_bytes())
    }

    /// Same bytes with bit sense flipped (`0`=ink), used where a wire format
    /// expects white-on-the-wire rather than ink-on-the-wire.
    pub fn inverted_bytes(&self) -> Vec<u8> {
        self.buffer.iter().map(|b| !b).collect()
    }

    /// Renders each row as uppercase hex, `width_bytes()*2` characters wide.
    pub fn hex_rows(&self) -> impl Iterator<Item = String> + '_ {
        self.rows().map(|row| {
            row.iter().map(|b| format!("{:02X}", b)).collect::<String>()
        })
    }

    /// Renders each row as a string of `'0'`/`'1'` characters, one per pixel,
    /// matching the Bitmap's own sense (`1`=ink).
    pub fn bit_rows(&self) -> impl Iterator<Item = String> + '_ {
        self.rows().map(|row| {
            let mut s = String::with_capacity(row.len() * 8);
            for byte in row {
                for i in (0..8).rev() {
                    s.push(if (byte >> i) & 1 == 1 { '1' } else { '0' });
                }
            }
            s
        })
    }

    /// Returns the pixel at `(x, y)` (`true` = ink), `(0, 0)` is top-left.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let row_start = y * self.width_bytes();
        let byte = self.buffer[row_start + x / 8];
        (byte >> (7 - (x % 8))) & 1 == 1
    }

    /// Rotates the bitmap 180 degrees.
    pub fn rotate_180(&self) -> Bitmap {
        let width_bytes = self.width_bytes();
        let mut out = vec![0u8; self.buffer.len()];
        for (dst_row, src_row) in self.rows().rev().enumerate() {
            let dst_start = dst_row * width_bytes;
            for x in 0..self.width {
                let bit = {
                    let byte = src_row[x / 8];
                    (byte >> (7 - (x % 8))) & 1
                };
                if bit == 1 {
                    let dst_x = self.width - 1 - x;
                    out[dst_start + dst_x / 8] |= 1 << (7 - (dst_x % 8));
                }
            }
        }
        Bitmap {
            width: self.width,
            height: self.height,
            buffer: out,
        }
    }

    /// Rotates the bitmap 90 degrees clockwise, transposing width and
    /// height. Used by the barcode optimiser (§4.9) to turn a
    /// horizontally-barred code into a vertically-barred one so the same
    /// column-wise pass catches both orientations.
    pub fn rotate_90_cw(&self) -> Bitmap {
        let new_width_bytes = (self.height + 7) / 8;
        let new_width = new_width_bytes * 8;
        let new_height = self.width;
        let mut out = vec![0u8; new_width_bytes * new_height];
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y) {
                    let dst_x = self.height - 1 - y;
                    let dst_y = x;
                    out[dst_y * new_width_bytes + dst_x / 8] |= 1 << (7 - (dst_x % 8));
                }
            }
        }
        Bitmap {
            width: new_width,
            height: new_height,
            buffer: out,
        }
    }

    /// Rotates the bitmap 90 degrees counter-clockwise; the inverse of
    /// [`Bitmap::rotate_90_cw`].
    pub fn rotate_90_ccw(&self) -> Bitmap {
        let new_width_bytes = (self.height + 7) / 8;
        let new_width = new_width_bytes * 8;
        let new_height = self.width;
        let mut out = vec![0u8; new_width_bytes * new_height];
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y) {
                    let dst_x = y;
                    let dst_y = self.width - 1 - x;
                    out[dst_y * new_width_bytes + dst_x / 8] |= 1 << (7 - (dst_x % 8));
                }
            }
        }
        Bitmap {
            width: new_width,
            height: new_height,
            buffer: out,
        }
    }

    /// Pads this bitmap's width up to the next multiple of 8 bits with
    /// white on the right. A no-op if already a multiple of 8.
    pub fn pad_width_to_byte(&self) -> Bitmap {
        if self.width % 8 == 0 {
            return self.clone();
        }
        let new_width = ((self.width / 8) + 1) * 8;
        self.pad_or_crop_to_width_bytes(new_width / 8, Alignment::Left)
    }

    /// Centre-pads (with white) or centre-crops each row to exactly
    /// `target_width_bytes` bytes, matching the Brother encoder's head-width
    /// fitting step (§4.7 step 1).
    pub fn pad_or_crop_to_width_bytes(&self, target_width_bytes: usize, align: Alignment) -> Bitmap {
        let current = self.width_bytes();
        if current == target_width_bytes {
            return self.clone();
        }
        let mut out = Vec::with_capacity(target_width_bytes * self.height);
        if current < target_width_bytes {
            let diff = target_width_bytes - current;
            let (left, right) = align.split(diff);
            for row in self.rows() {
                out.extend(std::iter::repeat(0u8).take(left));
                out.extend_from_slice(row);
                out.extend(std::iter::repeat(0u8).take(right));
            }
        } else {
            let diff = current - target_width_bytes;
            let (left, right) = align.split(diff);
            for row in self.rows() {
                out.extend_from_slice(&row[left..row.len() - right]);
            }
        }
        Bitmap {
            width: target_width_bytes * 8,
            height: self.height,
            buffer: out,
        }
    }
}

/// How to split the byte-count difference when padding/cropping a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// All of the difference goes on the right (used by §4.2's horizontal
    /// byte-padding, which pads "on the right").
    Left,
    /// Split the difference left/right, extra byte on the right, matching
    /// the Brother encoder's `diff // 2` / `diff - left` split (§4.7 step 1).
    Centre,
}

impl Alignment {
    fn split(self, diff: usize) -> (usize, usize) {
        match self {
            Alignment::Left => (0, diff),
            Alignment::Centre => {
                let left = diff / 2;
                (left, diff - left)
            }
        }
    }
}

/// Rotates every page 180 degrees and reverses page order — the bulk
/// "print in reverse" helper named in spec.md §3.
pub fn rotate_pages(pages: &[Bitmap]) -> Vec<Bitmap> {
    let mut rotated: Vec<Bitmap> = pages.iter().map(Bitmap::rotate_180).collect();
    rotated.reverse();
    rotated
}

#[cfg(feature = "png")]
impl Bitmap {
    /// Builds a bitmap from any image, converting to 1-bit black/white and
    /// padding width to the next multiple of 8 with white on the right,
    /// matching `RasterLabel.from_images` in the source.
    pub fn from_dynamic_image(image: &image::DynamicImage) -> Bitmap {
        let gray = image.to_luma8();
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let width_bytes = (w + 7) / 8;
        let mut buffer = vec![0u8; width_bytes * h];
        for y in 0..h {
            for x in 0..w {
                let pixel = gray.get_pixel(x as u32, y as u32).0[0];
                if pixel < 128 {
                    buffer[y * width_bytes + x / 8] |= 1 << (7 - (x % 8));
                }
            }
        }
        Bitmap {
            width: width_bytes * 8,
            height: h,
            buffer,
        }
    }

    /// Renders this bitmap to a 1-bit `DynamicImage` (ink -> black).
    pub fn to_dynamic_image(&self) -> image::DynamicImage {
        let mut img = image::GrayImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let value = if self.pixel(x, y) { 0u8 } else { 255u8 };
                img.put_pixel(x as u32, y as u32, image::Luma([value]));
            }
        }
        image::DynamicImage::ImageLuma8(img)
    }
}
