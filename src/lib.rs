// Export modules for use in tests and the binary
pub mod cache;
pub mod document;
pub mod embed;
pub mod error;
pub mod markdown;
pub mod output;
pub mod processor;
pub mod settings;
pub mod vault;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use document::{DocumentLoader, PdfDocument, PdfPage, Raster};
pub use error::EmbedError;
pub use processor::{BlockProcessor, NoteStats, RenderContext};
pub use settings::{Settings, SettingsStore};
pub use vault::{FileReader, Vault};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
