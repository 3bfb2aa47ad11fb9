//! Rendering a PDF label to per-page bitmaps is delegated to an external
//! collaborator (§3 "Non-goals" excludes PDF layout/rasterisation logic
//! itself, but a complete driver still needs a seam for it). The default
//! implementation shells out to Ghostscript, exactly as the source does;
//! tests substitute [`FakeRenderer`].

use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::bitmap::Bitmap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("failed to launch external renderer: {0}")]
    Spawn(String),
    /// Any stderr output from the external renderer is treated as fatal,
    /// regardless of exit status (§6/§7): `gs` writes warnings and errors
    /// alike to stderr and doesn't reliably use a non-zero exit code for
    /// rendering failures.
    #[error("external renderer reported an error: {0}")]
    ExternalRenderFailure(String),
    #[error("no pages were produced from the input")]
    NoPages,
    #[error(transparent)]
    Bitmap(#[from] crate::bitmap::BitmapError),
}

/// Converts a PDF document into one [`Bitmap`] per page at `dpi`.
pub trait PdfRenderer {
    fn render_pages(&self, pdf_bytes: &[u8], dpi: u32) -> Result<Vec<Bitmap>, RenderError>;
}

/// Which pixel-centring convention Ghostscript should use; newer
/// Ghostscript releases changed the default and need an explicit flag to
/// match older rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CenterOfPixel {
    #[default]
    Default,
    /// `-dCenterOfPixel` — matches Ghostscript 9.22 through 9.26.
    Explicit,
    /// `-dCenterOfPixel=false` — matches Ghostscript 9.26 and later when
    /// the old centring convention is still required.
    ExplicitFalse,
}

/// Shells out to `gs` to rasterise a PDF into one monochrome PNG per page,
/// then decodes each PNG into a [`Bitmap`].
#[derive(Debug, Clone)]
pub struct GhostscriptRenderer {
    pub binary: String,
    pub center_of_pixel: CenterOfPixel,
}

impl Default for GhostscriptRenderer {
    fn default() -> Self {
        Self {
            binary: "gs".to_string(),
            center_of_pixel: CenterOfPixel::default(),
        }
    }
}

impl PdfRenderer for GhostscriptRenderer {
    fn render_pages(&self, pdf_bytes: &[u8], dpi: u32) -> Result<Vec<Bitmap>, RenderError> {
        let mut args = vec![
            "-q".to_string(),
            "-dNOPAUSE".to_string(),
            "-dBATCH".to_string(),
            "-sDEVICE=pngmono".to_string(),
            format!("-r{dpi}"),
            "-sOutputFile=-".to_string(),
        ];
        match self.center_of_pixel {
            CenterOfPixel::Default => {}
            CenterOfPixel::Explicit => args.push("-dCenterOfPixel".to_string()),
            CenterOfPixel::ExplicitFalse => args.push("-dCenterOfPixel=false".to_string()),
        }
        args.push("-".to_string());

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Spawn(e.to_string()))?;

        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(pdf_bytes)
            .map_err(|e| RenderError::Spawn(e.to_string()))?;

        let output = child
            .wait_with_output()
            .map_err(|e| RenderError::Spawn(e.to_string()))?;
        if !output.stderr.is_empty() {
            return Err(RenderError::ExternalRenderFailure(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        split_png_pages(&output.stdout)
    }
}

/// Ghostscript's multi-page PNG output to a single stream concatenates one
/// PNG file per page; split on the PNG file signature.
fn split_png_pages(data: &[u8]) -> Result<Vec<Bitmap>, RenderError> {
    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    let mut offsets = Vec::new();
    let mut search_from = 0;
    while let Some(pos) = find_subslice(&data[search_from..], PNG_SIGNATURE) {
        offsets.push(search_from + pos);
        search_from += pos + PNG_SIGNATURE.len();
    }
    if offsets.is_empty() {
        return Err(RenderError::NoPages);
    }

    #[cfg(feature = "png")]
    {
        let mut pages = Vec::with_capacity(offsets.len());
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).copied().unwrap_or(data.len());
            let png_bytes = &data[start..end];
            let image = image::load_from_memory(png_bytes)
                .map_err(|e| RenderError::ExternalRenderFailure(e.to_string()))?;
            pages.push(Bitmap::from_dynamic_image(&image).pad_width_to_byte());
        }
        Ok(pages)
    }
    #[cfg(not(feature = "png"))]
    {
        let _ = offsets;
        Err(RenderError::NoPages)
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A renderer for tests: returns a fixed set of pages regardless of input.
#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
    pub pages: Vec<Bitmap>,
}

impl PdfRenderer for FakeRenderer {
    fn render_pages(&self, _pdf_bytes: &[u8], _dpi: u32) -> Result<Vec<Bitmap>, RenderError> {
        if self.pages.is_empty() {
            Err(RenderError::NoPages)
        } else {
            Ok(self.pages.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_renderer_returns_configured_pages() {
        let bitmap = Bitmap::new(8, 1, vec![0xFF]).unwrap();
        let renderer = FakeRenderer {
            pages: vec![bitmap.clone()],
        };
        let pages = renderer.render_pages(b"not a real pdf", 300).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].buffer(), bitmap.buffer());
    }

    #[test]
    fn fake_renderer_with_no_pages_errors() {
        let renderer = FakeRenderer::default();
        assert_eq!(
            renderer.render_pages(b"", 300),
            Err(RenderError::NoPages)
        );
    }

    #[test]
    fn split_png_pages_finds_each_signature() {
        let mut data = Vec::new();
        data.extend_from_slice(b"\x89PNG\r\n\x1a\n");
        data.extend_from_slice(b"fakepagecontentaaaa");
        data.extend_from_slice(b"\x89PNG\r\n\x1a\n");
        data.extend_from_slice(b"fakepagecontentbbbb");
        // Without the `png` feature this errors on decode, but signature
        // splitting itself should still find both pages' offsets.
        let result = split_png_pages(&data);
        assert!(result.is_err() || matches!(result, Ok(ref pages) if pages.len() == 2));
    }
}
