//! Rendered page assets and the HTML that embeds them

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use image::{ImageFormat, RgbImage};
use log::debug;

use crate::document::Raster;
use crate::embed::RenderPlan;

/// Somewhere to put rendered pages.
pub trait RasterSink {
    /// Persist `raster` and return the vault-relative path it can be
    /// referenced by.
    fn store(&mut self, plan: &RenderPlan, raster: &Raster) -> anyhow::Result<String>;
}

/// Writes each page as a PNG into an asset folder inside the vault.
pub struct PngAssets {
    dir: PathBuf,
    /// Vault-relative path of `dir`
    vault_prefix: String,
}

impl PngAssets {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, vault_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            vault_prefix: vault_prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

impl RasterSink for PngAssets {
    fn store(&mut self, plan: &RenderPlan, raster: &Raster) -> anyhow::Result<String> {
        let name = asset_file_name(plan);
        let target = self.dir.join(&name);

        if target.exists() {
            debug!("Reusing {target:?}");
        } else {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("failed to create {}", self.dir.display()))?;
            let image = RgbImage::from_raw(raster.width, raster.height, raster.pixels.clone())
                .context("raster buffer does not match its dimensions")?;
            image
                .save_with_format(&target, ImageFormat::Png)
                .with_context(|| format!("failed to write {}", target.display()))?;
            debug!("Wrote {target:?}");
        }

        Ok(if self.vault_prefix.is_empty() {
            name
        } else {
            format!("{}/{name}", self.vault_prefix)
        })
    }
}

/// `<stem>-p<page>-<digest>.png`; the digest covers every geometry input so
/// a changed block never reuses a stale image.
#[must_use]
pub fn asset_file_name(plan: &RenderPlan) -> String {
    let stem = plan
        .path
        .rsplit('/')
        .next()
        .unwrap_or(&plan.path)
        .trim_end_matches(".pdf")
        .trim_end_matches(".PDF");
    let stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    let key = format!(
        "{}|{}|{}|{}|{}|{}|{}x{}",
        plan.path,
        plan.page_number,
        plan.viewport_scale,
        plan.rotation,
        plan.offset_x,
        plan.offset_y,
        plan.output_width,
        plan.output_height,
    );
    let digest = format!("{:x}", md5::compute(key.as_bytes()));

    format!("{stem}-p{}-{}.png", plan.page_number, &digest[..12])
}

/// Path from a note in `from_folder` to the vault-relative `target`.
#[must_use]
pub fn relative_href(from_folder: &str, target: &str) -> String {
    let from: Vec<&str> = from_folder.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}

/// HTML for one rendered page.
#[must_use]
pub fn page_fragment(plan: &RenderPlan, src: &str) -> String {
    let img = if plan.fit {
        format!(
            "<img src=\"{}\" alt=\"page {}\" style=\"width: 100%\">",
            escape(src),
            plan.page_number
        )
    } else {
        format!(
            "<img src=\"{}\" alt=\"page {}\" width=\"{}\" height=\"{}\">",
            escape(src),
            plan.page_number,
            plan.output_width,
            plan.output_height
        )
    };

    if plan.link {
        format!(
            "<a class=\"internal-link\" href=\"{}\">{img}</a>",
            escape(&plan.href())
        )
    } else {
        img
    }
}

/// HTML shown in place of a failed block or page.
#[must_use]
pub fn error_fragment(message: &str) -> String {
    format!("<h2 class=\"pdf-embed-error\">{}</h2>", escape(message))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
