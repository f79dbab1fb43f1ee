use anyhow::Context;
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::embed::LinkResolver;

/// Reads whole files by vault-relative path.
pub trait FileReader {
    fn read_binary(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// A folder of notes and attachments, addressed with `/`-separated paths
/// relative to its root.
pub struct Vault {
    root: PathBuf,
    files: BTreeSet<String>,
}

impl Vault {
    /// Index every file under `root`, skipping hidden directories.
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("Vault root {root:?} is not a directory");
        }

        let mut files = BTreeSet::new();
        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if let Some(rel) = relative_to(&root, entry.path()) {
                files.insert(rel);
            }
        }

        info!("Indexed {} files under {root:?}", files.len());
        Ok(Self { root, files })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// Vault-relative form of `path`, which may be absolute or relative to
    /// the vault root.
    #[must_use]
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        if path.is_absolute() {
            let root = fs::canonicalize(&self.root).ok()?;
            let path = fs::canonicalize(path).ok()?;
            relative_to(&root, &path)
        } else {
            relative_to(Path::new(""), path)
        }
    }

    /// Filesystem location of a vault-relative path.
    #[must_use]
    pub fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn find_by_name(&self, link: &str) -> Option<&String> {
        let suffix = format!("/{link}");
        self.files
            .iter()
            .filter(|f| *f == link || f.ends_with(&suffix))
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
    }
}

impl FileReader for Vault {
    fn read_binary(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let full = self.full_path(path);
        fs::read(&full).with_context(|| format!("failed to read {}", full.display()))
    }
}

impl LinkResolver for Vault {
    fn resolve_link_path(&self, link: &str, source_folder: &str) -> Option<String> {
        let link = link.trim().trim_start_matches('/');
        if link.is_empty() {
            return None;
        }

        let mut names = vec![link.to_string()];
        if Path::new(link).extension().is_none() {
            names.push(format!("{link}.md"));
        }

        for name in &names {
            if !source_folder.is_empty() {
                let local = format!("{source_folder}/{name}");
                if self.contains(&local) {
                    return Some(local);
                }
            }
            if self.contains(name) {
                return Some(name.clone());
            }
            if let Some(found) = self.find_by_name(name) {
                debug!("Link {link:?} matched {found}");
                return Some(found.clone());
            }
        }
        None
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}
