//! MuPDF-backed document loader and page rasterizer

use std::rc::Rc;

use mupdf::{Colorspace, Document, Matrix, Page, Pixmap};

use crate::document::{DocumentLoader, PdfDocument, PdfPage, Raster, raster_len};
use crate::embed::{RenderPlan, Viewport};

const PDF_MAGIC: &str = "application/pdf";

/// Opens PDF bytes with MuPDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfLoader;

impl DocumentLoader for MupdfLoader {
    fn load(&self, bytes: Vec<u8>) -> anyhow::Result<Rc<dyn PdfDocument>> {
        let doc = Document::from_bytes(&bytes, PDF_MAGIC).map_err(engine)?;
        Ok(Rc::new(MupdfDocument { doc }))
    }
}

pub struct MupdfDocument {
    doc: Document,
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> anyhow::Result<usize> {
        let count = self.doc.page_count().map_err(engine)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn page(&self, number: usize) -> anyhow::Result<Box<dyn PdfPage + '_>> {
        let count = self.page_count()?;
        if number == 0 || number > count {
            anyhow::bail!("page {number} does not exist, the document has {count} pages");
        }
        let page = self.doc.load_page(number as i32 - 1).map_err(engine)?;
        Ok(Box::new(MupdfPage { page }))
    }
}

pub struct MupdfPage {
    page: Page,
}

impl PdfPage for MupdfPage {
    fn page_size(&self) -> anyhow::Result<Viewport> {
        let bounds = self.page.bounds().map_err(engine)?;
        Ok(Viewport::new(
            f64::from(bounds.x1 - bounds.x0),
            f64::from(bounds.y1 - bounds.y0),
        ))
    }

    fn render(&self, plan: &RenderPlan) -> anyhow::Result<Raster> {
        // MuPDF draws the whole page before the crop is applied
        let full = plan.natural_viewport();
        raster_len(full.width.ceil() as u32, full.height.ceil() as u32)?;

        let bounds = self.page.bounds().map_err(engine)?;
        let corners = [
            (bounds.x0, bounds.y0),
            (bounds.x1, bounds.y0),
            (bounds.x0, bounds.y1),
            (bounds.x1, bounds.y1),
        ];
        let transform = ViewportTransform::new(plan, &corners);

        let rgb = Colorspace::device_rgb();
        let pixmap = self
            .page
            .to_pixmap(&transform.matrix(), &rgb, false, false)
            .map_err(engine)?;

        let source = PixelSource::from_pixmap(&pixmap)?;
        source.blit(plan.output_width, plan.output_height)
    }
}

/// Page space to output pixels: scale, rotate clockwise, then shift so the
/// rotated page starts at the origin before applying the crop offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ViewportTransform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl ViewportTransform {
    fn new(plan: &RenderPlan, corners: &[(f32, f32)]) -> Self {
        let scale = plan.viewport_scale as f32;
        let radians = (f64::from(plan.rotation.rem_euclid(360))).to_radians();
        let (sin, cos) = (radians.sin() as f32, radians.cos() as f32);
        let (a, b, c, d) = (scale * cos, scale * sin, -scale * sin, scale * cos);

        let (min_x, min_y) = corners.iter().fold((f32::MAX, f32::MAX), |(mx, my), &(x, y)| {
            (mx.min(x * a + y * c), my.min(x * b + y * d))
        });

        Self {
            a,
            b,
            c,
            d,
            e: -min_x + plan.offset_x as f32,
            f: -min_y + plan.offset_y as f32,
        }
    }

    fn matrix(self) -> Matrix {
        Matrix::new(self.a, self.b, self.c, self.d, self.e, self.f)
    }
}

/// Borrowed pixmap samples plus where the pixmap sits in output space.
struct PixelSource<'a> {
    samples: &'a [u8],
    origin_x: i64,
    origin_y: i64,
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a> PixelSource<'a> {
    fn from_pixmap(pixmap: &'a Pixmap) -> anyhow::Result<Self> {
        let channels = pixmap.n() as usize;
        if channels < 3 {
            anyhow::bail!("Unsupported pixmap format: {channels} channels");
        }
        let source = Self {
            samples: pixmap.samples(),
            origin_x: i64::from(pixmap.x()),
            origin_y: i64::from(pixmap.y()),
            width: pixmap.width() as usize,
            height: pixmap.height() as usize,
            stride: pixmap.stride() as usize,
            channels,
        };
        if source.samples.len() < source.stride * source.height
            || source.width * channels > source.stride
        {
            anyhow::bail!("Pixmap buffer size mismatch");
        }
        Ok(source)
    }

    /// Copy into an RGB raster of the requested size. Output pixels the page
    /// does not cover stay white.
    fn blit(&self, out_width: u32, out_height: u32) -> anyhow::Result<Raster> {
        let mut raster = Raster::blank(out_width, out_height)?;
        let out_w = out_width as usize;

        for oy in 0..out_height as usize {
            let sy = oy as i64 - self.origin_y;
            if sy < 0 || sy >= self.height as i64 {
                continue;
            }
            let row = &self.samples[sy as usize * self.stride..];
            for ox in 0..out_w {
                let sx = ox as i64 - self.origin_x;
                if sx < 0 || sx >= self.width as i64 {
                    continue;
                }
                let src = sx as usize * self.channels;
                let dst = (oy * out_w + ox) * 3;
                raster.pixels[dst..dst + 3].copy_from_slice(&row[src..src + 3]);
            }
        }
        Ok(raster)
    }
}

fn engine(err: mupdf::error::Error) -> anyhow::Error {
    anyhow::anyhow!("PDF engine: {err}")
}
