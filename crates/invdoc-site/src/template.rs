//! Template lookup over a search path.

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Error returned by a [`TemplateLoader`].
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No directory of the search path holds the template.
    #[error("template '{name}' not found in search path [{}]", join_paths(.search_path))]
    NotFound {
        /// Requested file name.
        name: String,
        /// Directories probed, in order.
        search_path: Vec<PathBuf>,
    },
    /// The template exists but cannot be read as UTF-8 text.
    #[error("cannot read template {}: {source}", .path.display())]
    Io {
        /// Path of the template file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for (idx, path) in paths.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", path.display());
    }
    out
}

/// Resolves template names to template text.
pub trait TemplateLoader {
    /// Return the text of the first `dir/name` found along `search_path`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] when no directory holds the file
    /// (always for an empty search path).
    fn load(&self, name: &str, search_path: &[PathBuf]) -> Result<String, TemplateError>;
}

/// Loads templates from the file system, uncached.
///
/// Names are resolved inside each directory; a candidate that ends up
/// outside its directory after following `..` or symlinks is treated as
/// absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTemplateLoader;

impl TemplateLoader for FsTemplateLoader {
    fn load(&self, name: &str, search_path: &[PathBuf]) -> Result<String, TemplateError> {
        for dir in search_path {
            let Some(path) = resolve_inside(dir, name) else {
                continue;
            };
            tracing::debug!(template = name, path = %path.display(), "Resolved template");
            return std::fs::read_to_string(&path).map_err(|source| TemplateError::Io { path, source });
        }

        Err(TemplateError::NotFound {
            name: name.to_owned(),
            search_path: search_path.to_vec(),
        })
    }
}

/// Canonical path of `dir/name` if it is a file inside `dir`.
fn resolve_inside(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if !candidate.is_file() {
        return None;
    }

    let root = dir.canonicalize().ok()?;
    let resolved = candidate.canonicalize().ok()?;
    if resolved.starts_with(&root) {
        Some(resolved)
    } else {
        tracing::debug!(
            template = name,
            dir = %dir.display(),
            "Skipping template outside its search directory"
        );
        None
    }
}
