//! Defaults and validation for render options

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use super::parser::RawParameterBlock;
use crate::settings::Settings;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;
pub const DEFAULT_SCALE: f64 = 1.0;

/// Crop box `[x, y, w, h]` in page units.
///
/// A width below 1 means "no crop, natural size".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn has_explicit_size(&self) -> bool {
        self.width >= 1.0
    }
}

/// Fully defaulted options shared by every page of a block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RenderOptions {
    pub scale: f64,
    /// Degrees, not validated
    pub rotation: i32,
    pub fit: bool,
    pub link: bool,
    pub rect: CropRect,
}

impl RenderOptions {
    /// Fill every option from the block, falling back to constants or settings.
    /// Never fails.
    #[must_use]
    pub fn from_block(block: &RawParameterBlock, settings: &Settings) -> Self {
        Self {
            scale: scale_or_default(block.get("scale")),
            rotation: rotation_or_default(block.get("rotation")),
            fit: bool_or(block.get("fit"), "fit", settings.fit_by_default),
            link: bool_or(block.get("link"), "link", settings.link_by_default),
            rect: rect_or_default(block.get("rect")),
        }
    }
}

pub fn apply_defaults(block: &RawParameterBlock, settings: &Settings) -> RenderOptions {
    RenderOptions::from_block(block, settings)
}

/// Out-of-range scales are replaced, not pinned to the nearest bound.
fn scale_or_default(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return DEFAULT_SCALE;
    };
    match value.as_f64() {
        Some(scale) if (MIN_SCALE..=MAX_SCALE).contains(&scale) => scale,
        Some(scale) => {
            debug!("Scale {scale} outside {MIN_SCALE}..={MAX_SCALE}, using {DEFAULT_SCALE}");
            DEFAULT_SCALE
        }
        None => {
            warn!("Ignoring non-numeric scale {value}");
            DEFAULT_SCALE
        }
    }
}

fn rotation_or_default(value: Option<&Value>) -> i32 {
    let Some(value) = value else {
        return 0;
    };
    let rotation = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .and_then(|r| i32::try_from(r).ok());
    rotation.unwrap_or_else(|| {
        warn!("Ignoring malformed rotation {value}");
        0
    })
}

fn bool_or(value: Option<&Value>, name: &str, default: bool) -> bool {
    match value {
        None => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!("Ignoring non-boolean {name} {other}");
            default
        }
    }
}

fn rect_or_default(value: Option<&Value>) -> CropRect {
    let Some(value) = value else {
        return CropRect::default();
    };
    let numbers: Option<Vec<f64>> = value
        .as_array()
        .and_then(|items| items.iter().map(Value::as_f64).collect());
    match numbers.as_deref() {
        Some(&[x, y, width, height]) => CropRect::new(x, y, width, height),
        _ => {
            warn!("Ignoring malformed rect {value}, expected [x, y, w, h]");
            CropRect::default()
        }
    }
}
