//! Parameter resolution and page selection for pdf blocks

pub mod options;
pub mod pages;
pub mod parser;
pub mod plan;
pub mod reference;

pub use options::{CropRect, RenderOptions, apply_defaults};
pub use pages::{PageEntry, PageSelector, expand_pages};
pub use parser::{RawParameterBlock, parse};
pub use plan::{RenderPlan, Viewport, build_plan};
pub use reference::{LinkResolver, ResolvedReference, SourceContext, resolve_reference};
