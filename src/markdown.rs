//! Locating pdf blocks in a note and splicing rendered output back in
//!
//! Rendering keeps the block text inside an HTML comment ahead of the output:
//!
//! ````text
//! <!-- pdfembed-begin
//! ```pdf
//! {"url": "paper.pdf"}
//! ```
//! -->
//! <a ...><img ...></a>
//! <!-- pdfembed-end -->
//! ````
//!
//! A later pass recognises the region and regenerates it from the kept
//! block, so rendering the same note twice never nests output.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

const REGION_BEGIN: &str = "<!-- pdfembed-begin";
const REGION_END: &str = "<!-- pdfembed-end -->";

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?ms)<!-- pdfembed-begin\r?\n```pdf[ \t]*\r?\n(?P<kept>.*?)^```[ \t]*\r?\n-->\r?\n.*?<!-- pdfembed-end -->",
        r"|^```pdf[ \t]*\r?\n(?P<src>.*?)^```[ \t]*\r?$",
    ))
    .expect("pdf block regex is valid")
});

/// One pdf block of a note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfBlock {
    /// Byte range in the note covered by the block, or by the region
    /// generated from it on an earlier pass.
    pub span: Range<usize>,
    /// Parameter text between the fences.
    pub source: String,
    pub previously_rendered: bool,
}

/// All pdf blocks, in document order.
#[must_use]
pub fn find_blocks(note: &str) -> Vec<PdfBlock> {
    BLOCK_RE
        .captures_iter(note)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (source, previously_rendered) = match (caps.name("kept"), caps.name("src")) {
                (Some(kept), _) => (kept.as_str(), true),
                (None, Some(src)) => (src.as_str(), false),
                (None, None) => return None,
            };
            Some(PdfBlock {
                span: whole.range(),
                source: source.to_string(),
                previously_rendered,
            })
        })
        .collect()
}

/// Replace each block with its rendered region.
///
/// `outputs` pairs up with `blocks` by position; extra entries on either
/// side are ignored.
#[must_use]
pub fn splice(note: &str, blocks: &[PdfBlock], outputs: &[String]) -> String {
    let mut result = String::with_capacity(note.len());
    let mut cursor = 0;

    for (block, output) in blocks.iter().zip(outputs) {
        if block.span.start < cursor {
            continue;
        }
        result.push_str(&note[cursor..block.span.start]);
        result.push_str(&render_region(&block.source, output));
        cursor = block.span.end;
    }
    result.push_str(&note[cursor..]);
    result
}

fn render_region(source: &str, output: &str) -> String {
    let mut region = String::new();
    region.push_str(REGION_BEGIN);
    region.push_str("\n```pdf\n");
    region.push_str(source);
    if !source.is_empty() && !source.ends_with('\n') {
        region.push('\n');
    }
    region.push_str("```\n-->\n");
    region.push_str(output);
    if !output.ends_with('\n') {
        region.push('\n');
    }
    region.push_str(REGION_END);
    region
}
