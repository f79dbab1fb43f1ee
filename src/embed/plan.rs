//! Per-page render plans
//!
//! A plan is built in two steps. [`build_plan`] only needs the page size and
//! the block options. When the page is shown fit-to-width, the display width
//! becomes known later and [`RenderPlan::fit_to_width`] recomputes the pixel
//! scale so the bitmap is rendered at the resolution it will be displayed at.

use serde::Serialize;

use super::options::{CropRect, RenderOptions};
use super::reference::ResolvedReference;

/// Width and height in page units (points) or pixels, depending on scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of the page at `scale`, after rotating it by `rotation` degrees.
    ///
    /// Quarter turns swap the sides; any other angle takes the bounding box
    /// of the rotated page.
    #[must_use]
    pub fn at(self, scale: f64, rotation: i32) -> Self {
        let (w, h) = (self.width * scale, self.height * scale);
        match rotation.rem_euclid(360) {
            0 | 180 => Self::new(w, h),
            90 | 270 => Self::new(h, w),
            degrees => {
                let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
                Self::new(
                    w * cos.abs() + h * sin.abs(),
                    w * sin.abs() + h * cos.abs(),
                )
            }
        }
    }
}

/// Everything the renderer needs for one page. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderPlan {
    pub path: String,
    /// 1-based
    pub page_number: usize,
    /// Position within the block's page sequence
    pub index: usize,
    /// Scale the user asked for
    pub scale: f64,
    /// Scale the page is actually rasterized at
    pub viewport_scale: f64,
    pub rotation: i32,
    pub offset_x: i64,
    pub offset_y: i64,
    pub output_width: u32,
    pub output_height: u32,
    pub fit: bool,
    pub link: bool,
    pub rect: CropRect,
    /// Unrotated page size at scale 1
    pub page_size: Viewport,
}

impl RenderPlan {
    /// Natural viewport of the page at the effective scale.
    #[must_use]
    pub fn natural_viewport(&self) -> Viewport {
        self.page_size.at(self.viewport_scale, self.rotation)
    }

    /// Target of the hyperlink wrapping this page.
    #[must_use]
    pub fn href(&self) -> String {
        format!("{}#page={}", self.path, self.page_number)
    }

    /// Second build step for fit-to-width pages.
    ///
    /// The requested scale is kept as a resolution multiplier on top of the
    /// display width: at scale 1 the bitmap is exactly `display_width` pixels
    /// wide. Plans without `fit`, or a zero display width, come back unchanged.
    #[must_use]
    pub fn fit_to_width(&self, display_width: u32) -> Self {
        if !self.fit || display_width == 0 {
            return self.clone();
        }
        let intrinsic_width = if self.rect.has_explicit_size() {
            self.rect.width
        } else {
            self.page_size.at(1.0, self.rotation).width
        };
        if intrinsic_width <= 0.0 {
            return self.clone();
        }

        let ratio = intrinsic_width / f64::from(display_width);
        self.with_viewport_scale(self.scale / ratio)
    }

    fn with_viewport_scale(&self, viewport_scale: f64) -> Self {
        let rect = self.rect;
        let (output_width, output_height) = if rect.has_explicit_size() {
            (
                to_pixels(rect.width * viewport_scale),
                to_pixels(rect.height * viewport_scale),
            )
        } else {
            let natural = self.page_size.at(viewport_scale, self.rotation);
            (to_pixels(natural.width), to_pixels(natural.height))
        };

        Self {
            viewport_scale,
            offset_x: (-rect.x * viewport_scale).floor() as i64,
            offset_y: (-rect.y * viewport_scale).floor() as i64,
            output_width,
            output_height,
            ..self.clone()
        }
    }
}

/// Build the provisional plan for one page.
///
/// `page_size` is the page's unrotated size at scale 1, as reported by the
/// document.
#[must_use]
pub fn build_plan(
    reference: &ResolvedReference,
    page_number: usize,
    index: usize,
    options: &RenderOptions,
    page_size: Viewport,
) -> RenderPlan {
    let base = RenderPlan {
        path: reference.path.clone(),
        page_number,
        index,
        scale: options.scale,
        viewport_scale: options.scale,
        rotation: options.rotation,
        offset_x: 0,
        offset_y: 0,
        output_width: 0,
        output_height: 0,
        fit: options.fit,
        link: options.link,
        rect: options.rect,
        page_size,
    };
    base.with_viewport_scale(options.scale)
}

fn to_pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
