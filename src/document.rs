//! Decoder/renderer seams
//!
//! The block processor never talks to a PDF library directly. It goes
//! through these traits, so the engine can be driven by mupdf in the binary
//! and by in-memory fakes in tests.

use std::rc::Rc;

use anyhow::Context;

use crate::embed::{RenderPlan, Viewport};

/// Largest raster a single page may render to, in pixels.
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 26;

/// Byte length of an RGB buffer of `width` x `height` pixels.
///
/// Fails when the size is over [`MAX_OUTPUT_PIXELS`], so an oversized crop
/// or scale is reported instead of attempting the allocation.
pub fn raster_len(width: u32, height: u32) -> anyhow::Result<usize> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_OUTPUT_PIXELS {
        anyhow::bail!(
            "{width}x{height} output exceeds the limit of {MAX_OUTPUT_PIXELS} pixels"
        );
    }
    usize::try_from(pixels * 3).context("raster does not fit in memory")
}

/// Raw rendered page.
///
/// RGB pixel data, 3 bytes per pixel, rows top to bottom with no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Raster {
    /// White raster of the given size, subject to [`MAX_OUTPUT_PIXELS`].
    pub fn blank(width: u32, height: u32) -> anyhow::Result<Self> {
        Ok(Self {
            pixels: vec![0xFF; raster_len(width, height)?],
            width,
            height,
        })
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Opens document bytes.
pub trait DocumentLoader {
    fn load(&self, bytes: Vec<u8>) -> anyhow::Result<Rc<dyn PdfDocument>>;
}

/// A decoded document.
pub trait PdfDocument {
    fn page_count(&self) -> anyhow::Result<usize>;

    /// Fetch a page by 1-based number. Numbers past the end are an error.
    fn page(&self, number: usize) -> anyhow::Result<Box<dyn PdfPage + '_>>;
}

pub trait PdfPage {
    /// Unrotated size at scale 1, in page units.
    fn page_size(&self) -> anyhow::Result<Viewport>;

    /// Rasterize according to `plan`. The result is exactly
    /// `plan.output_width` x `plan.output_height` pixels.
    fn render(&self, plan: &RenderPlan) -> anyhow::Result<Raster>;
}
