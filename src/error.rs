//! Failures surfaced inline at an embed location

use thiserror::Error;

/// Everything that can go wrong while turning a pdf block into page images.
///
/// The `Display` text of each variant is what ends up in the rendered note,
/// so it is written for the reader of the note, not for a log file.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    #[error("{0}")]
    ParameterSyntax(String),

    #[error("Unable to resolve link: [[{0}]]")]
    UnresolvedLink(String),

    #[error("Unable to read {path}: {detail}")]
    FileRead { path: String, detail: String },

    #[error("Unable to open {path} as a PDF document: {detail}")]
    Decode { path: String, detail: String },

    #[error("Unable to render page {page} of {path}: {detail}")]
    PageFetch {
        path: String,
        page: usize,
        detail: String,
    },
}

impl EmbedError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::ParameterSyntax(msg.into())
    }

    pub fn file_read(path: &str, err: &anyhow::Error) -> Self {
        Self::FileRead {
            path: path.to_string(),
            detail: format!("{err:#}"),
        }
    }

    pub fn decode(path: &str, err: &anyhow::Error) -> Self {
        Self::Decode {
            path: path.to_string(),
            detail: format!("{err:#}"),
        }
    }

    pub fn page_fetch(path: &str, page: usize, err: &anyhow::Error) -> Self {
        Self::PageFetch {
            path: path.to_string(),
            page,
            detail: format!("{err:#}"),
        }
    }

    /// Text shown in place of the embed.
    ///
    /// Parameter problems get the same prefix the block processor has always
    /// used so users can tell a typo from a missing file at a glance.
    #[must_use]
    pub fn inline_message(&self) -> String {
        match self {
            Self::ParameterSyntax(msg) => format!("PDF Parameters invalid: {msg}"),
            other => other.to_string(),
        }
    }
}
