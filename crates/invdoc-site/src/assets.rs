//! Stylesheets shipped with directive output.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use invdoc_config::DirectiveSettings;

use crate::error::BuildError;

/// Output subdirectory holding copied stylesheets.
pub const STATIC_DIR: &str = "_static";

/// Copies directive stylesheets into `<output>/_static/`, each file name
/// at most once per build.
#[derive(Debug)]
pub struct AssetCopier {
    static_dir: PathBuf,
    copied: BTreeSet<String>,
}

impl AssetCopier {
    /// Create a copier writing below `output_dir`.
    #[must_use]
    pub fn new(output_dir: &Path) -> Self {
        Self {
            static_dir: output_dir.join(STATIC_DIR),
            copied: BTreeSet::new(),
        }
    }

    /// Copy the stylesheets of `settings` not copied yet.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Asset`] if a source stylesheet is missing or
    /// cannot be copied.
    pub fn copy(&mut self, settings: &DirectiveSettings) -> Result<(), BuildError> {
        for file in &settings.css_files {
            if self.copied.contains(file) {
                continue;
            }

            let source = settings.css_path.join(file);
            let target = self.static_dir.join(file);
            std::fs::create_dir_all(&self.static_dir)
                .and_then(|()| std::fs::copy(&source, &target))
                .map_err(|e| BuildError::Asset {
                    directive: settings.name.clone(),
                    path: source.clone(),
                    source: e,
                })?;

            tracing::debug!(stylesheet = %file, "Copied stylesheet");
            self.copied.insert(file.clone());
        }
        Ok(())
    }

    /// Number of distinct stylesheets copied.
    #[must_use]
    pub fn copied(&self) -> usize {
        self.copied.len()
    }
}

/// Ordered, duplicate-free list of stylesheets needed by one page.
#[derive(Debug, Default)]
pub struct PageStylesheets {
    files: Vec<String>,
}

impl PageStylesheets {
    /// Add the stylesheets of a directive used on the page.
    pub fn add(&mut self, settings: &DirectiveSettings) {
        for file in &settings.css_files {
            if !self.files.contains(file) {
                self.files.push(file.clone());
            }
        }
    }

    /// Hrefs relative to a page nested `depth` directories below the
    /// output root.
    #[must_use]
    pub fn hrefs(&self, depth: usize) -> Vec<String> {
        let prefix = "../".repeat(depth);
        self.files
            .iter()
            .map(|file| format!("{prefix}{STATIC_DIR}/{file}"))
            .collect()
    }
}
