//! Turning the `url` field into a vault path

use log::debug;

use crate::error::EmbedError;

/// Looks up internal `[[link]]` targets.
pub trait LinkResolver {
    /// Vault-relative path of the file `link` points at, searching from
    /// `source_folder` (empty for a vault-wide lookup).
    fn resolve_link_path(&self, link: &str, source_folder: &str) -> Option<String>;
}

/// The note currently being rendered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceContext {
    /// Vault-relative path of the note, `/` separated.
    pub source_path: String,
}

impl SourceContext {
    #[must_use]
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }

    /// Folder containing the note, empty at the vault root.
    #[must_use]
    pub fn folder(&self) -> &str {
        match self.source_path.rfind('/') {
            Some(idx) => &self.source_path[..idx],
            None => "",
        }
    }
}

/// A path the file reader understands. Never contains `[[`/`]]` link syntax.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedReference {
    pub path: String,
}

impl ResolvedReference {
    /// Hyperlink target for one page of this document.
    #[must_use]
    pub fn page_href(&self, page: usize) -> String {
        format!("{}#page={page}", self.path)
    }
}

pub fn resolve_reference(
    url: &str,
    source: &SourceContext,
    links: &dyn LinkResolver,
) -> Result<ResolvedReference, EmbedError> {
    if let Some(inner) = url.strip_prefix("[[").and_then(|u| u.strip_suffix("]]")) {
        let path = links
            .resolve_link_path(inner, "")
            .ok_or_else(|| EmbedError::UnresolvedLink(inner.to_string()))?;
        debug!("Resolved [[{inner}]] to {path}");
        return Ok(ResolvedReference { path });
    }

    if let Some(rest) = url.strip_prefix("./") {
        let folder = source.folder();
        let path = if folder.is_empty() {
            rest.to_string()
        } else {
            format!("{folder}/{rest}")
        };
        return Ok(ResolvedReference { path });
    }

    Ok(ResolvedReference {
        path: url.to_string(),
    })
}
