//! Block processor
//!
//! Drives one pdf block from raw text to rendered pages:
//! parse, resolve the url, default the options, read and decode the file,
//! expand the page selection, then plan and render each page in order.
//!
//! Pages are rendered strictly one after another so only one decoded bitmap
//! is alive at a time. A page that fails is reported in its own slot and the
//! remaining pages still render. Nothing escapes a block: every failure
//! becomes an inline error in the note.

use std::rc::Rc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::cache::DocumentCache;
use crate::document::{DocumentLoader, PdfDocument, PdfPage, Raster, raster_len};
use crate::embed::{
    LinkResolver, PageSelector, RenderOptions, RenderPlan, ResolvedReference, SourceContext,
    build_plan, parse, resolve_reference,
};
use crate::error::EmbedError;
use crate::markdown::{find_blocks, splice};
use crate::output::{RasterSink, error_fragment, page_fragment, relative_href};
use crate::settings::Settings;
use crate::vault::FileReader;

pub const DEFAULT_DISPLAY_WIDTH: u32 = 800;

/// Collaborators and settings for one render pass.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub settings: &'a Settings,
    pub files: &'a dyn FileReader,
    pub links: &'a dyn LinkResolver,
    pub loader: &'a dyn DocumentLoader,
    /// Width fit-to-width pages are rendered for, in pixels
    pub display_width: u32,
}

/// A block whose parameters are fully resolved and whose document is open.
pub struct ResolvedBlock {
    pub reference: ResolvedReference,
    pub options: RenderOptions,
    pub pages: Vec<usize>,
    document: Rc<dyn PdfDocument>,
}

/// Result of rendering one entry of the page sequence.
#[derive(Debug)]
pub enum PageOutcome {
    Rendered { plan: RenderPlan, raster: Raster },
    Failed { page: usize, error: EmbedError },
}

/// Result of planning one entry of the page sequence.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePlan {
    Planned(RenderPlan),
    Failed { page: usize, error: String },
}

/// Counts reported after processing a note.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoteStats {
    pub blocks: usize,
    pub failed_blocks: usize,
    pub pages: usize,
    pub failed_pages: usize,
}

pub struct BlockProcessor<'a> {
    ctx: RenderContext<'a>,
    documents: DocumentCache,
}

impl<'a> BlockProcessor<'a> {
    #[must_use]
    pub fn new(ctx: RenderContext<'a>) -> Self {
        Self {
            ctx,
            documents: DocumentCache::default(),
        }
    }

    /// Everything up to, but not including, per-page work.
    pub fn resolve(
        &mut self,
        raw: &str,
        source: &SourceContext,
    ) -> Result<ResolvedBlock, EmbedError> {
        let block = parse(raw)?;
        let url = block
            .url()
            .ok_or_else(|| EmbedError::syntax("missing required \"url\" string"))?;
        let reference = resolve_reference(url, source, self.ctx.links)?;
        let options = RenderOptions::from_block(&block, self.ctx.settings);
        let document = self.open(&reference.path)?;

        let pages = PageSelector::from_block(&block).expand(|| {
            document
                .page_count()
                .map_err(|e| EmbedError::decode(&reference.path, &e))
        })?;
        debug!(
            "{} pages selected from {}: {pages:?}",
            pages.len(),
            reference.path
        );

        Ok(ResolvedBlock {
            reference,
            options,
            pages,
            document,
        })
    }

    fn open(&mut self, path: &str) -> Result<Rc<dyn PdfDocument>, EmbedError> {
        if let Some(doc) = self.documents.get(path) {
            return Ok(doc);
        }
        let bytes = self
            .ctx
            .files
            .read_binary(path)
            .map_err(|e| EmbedError::file_read(path, &e))?;
        let doc = self
            .ctx
            .loader
            .load(bytes)
            .map_err(|e| EmbedError::decode(path, &e))?;
        info!("Opened {path}");
        self.documents.insert(path.to_string(), Rc::clone(&doc));
        Ok(doc)
    }

    fn fetch_page(block: &ResolvedBlock, page: usize) -> Result<Box<dyn PdfPage + '_>, EmbedError> {
        block
            .document
            .page(page)
            .map_err(|e| EmbedError::page_fetch(&block.reference.path, page, &e))
    }

    /// Final plan for one page, including the fit-to-width pass.
    fn plan_for(
        &self,
        block: &ResolvedBlock,
        index: usize,
        page: usize,
        handle: &dyn PdfPage,
    ) -> Result<RenderPlan, EmbedError> {
        let size = handle
            .page_size()
            .map_err(|e| EmbedError::page_fetch(&block.reference.path, page, &e))?;
        let provisional = build_plan(&block.reference, page, index, &block.options, size);
        Ok(provisional.fit_to_width(self.ctx.display_width))
    }

    /// Plans for every page of a block without rasterizing anything.
    #[must_use]
    pub fn plan_block(&self, block: &ResolvedBlock) -> Vec<PagePlan> {
        block
            .pages
            .iter()
            .enumerate()
            .map(|(index, &page)| {
                let planned = Self::fetch_page(block, page)
                    .and_then(|handle| self.plan_for(block, index, page, handle.as_ref()));
                match planned {
                    Ok(plan) => PagePlan::Planned(plan),
                    Err(error) => PagePlan::Failed {
                        page,
                        error: error.inline_message(),
                    },
                }
            })
            .collect()
    }

    /// Render every page of a block in sequence order.
    ///
    /// Keeps every raster in memory; [`BlockProcessor::process_block`]
    /// hands each page to the sink as soon as it is rendered instead.
    pub fn render_block(&self, block: &ResolvedBlock) -> Vec<PageOutcome> {
        block
            .pages
            .iter()
            .enumerate()
            .map(|(index, &page)| match self.render_page(block, index, page) {
                Ok((plan, raster)) => PageOutcome::Rendered { plan, raster },
                Err(error) => {
                    warn!("{error}");
                    PageOutcome::Failed { page, error }
                }
            })
            .collect()
    }

    fn render_page(
        &self,
        block: &ResolvedBlock,
        index: usize,
        page: usize,
    ) -> Result<(RenderPlan, Raster), EmbedError> {
        let handle = Self::fetch_page(block, page)?;
        let plan = self.plan_for(block, index, page, handle.as_ref())?;
        raster_len(plan.output_width, plan.output_height)
            .map_err(|e| EmbedError::page_fetch(&plan.path, page, &e))?;
        let raster = handle
            .render(&plan)
            .map_err(|e| EmbedError::page_fetch(&plan.path, page, &e))?;
        Ok((plan, raster))
    }

    /// HTML replacing one block: its pages in order, or a single error.
    pub fn process_block(
        &mut self,
        raw: &str,
        source: &SourceContext,
        sink: &mut dyn RasterSink,
        stats: &mut NoteStats,
    ) -> String {
        stats.blocks += 1;
        let block = match self.resolve(raw, source) {
            Ok(block) => block,
            Err(error) => {
                warn!("Skipping pdf block in {}: {error}", source.source_path);
                stats.failed_blocks += 1;
                return error_fragment(&error.inline_message());
            }
        };

        let mut fragments = Vec::with_capacity(block.pages.len());
        for (index, &page) in block.pages.iter().enumerate() {
            stats.pages += 1;
            let fragment = match self.render_page(&block, index, page) {
                Ok((plan, raster)) => match sink.store(&plan, &raster) {
                    Ok(asset) => page_fragment(&plan, &relative_href(source.folder(), &asset)),
                    Err(e) => {
                        warn!("Failed to store page {page} of {}: {e:#}", plan.path);
                        stats.failed_pages += 1;
                        error_fragment(&format!(
                            "Unable to save page {page} of {}: {e:#}",
                            plan.path
                        ))
                    }
                },
                Err(error) => {
                    warn!("{error}");
                    stats.failed_pages += 1;
                    error_fragment(&error.inline_message())
                }
            };
            fragments.push(fragment);
        }
        fragments.join("\n")
    }

    /// Rewrite a whole note, replacing every pdf block with its output.
    pub fn process_note(
        &mut self,
        note: &str,
        source: &SourceContext,
        sink: &mut dyn RasterSink,
    ) -> (String, NoteStats) {
        let blocks = find_blocks(note);
        let mut stats = NoteStats::default();
        let outputs: Vec<String> = blocks
            .iter()
            .map(|block| self.process_block(&block.source, source, sink, &mut stats))
            .collect();
        (splice(note, &blocks, &outputs), stats)
    }
}
