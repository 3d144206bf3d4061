//! Error types for site builds.

use std::path::PathBuf;

use invdoc_config::ConfigError;
use invdoc_directive::DirectiveError;
use invdoc_inventory::InventoryError;

use crate::render::RenderError;

/// Error returned by the site builder. Any error aborts the build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Reading sources or writing output failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Directive settings unusable (e.g. missing inventory credentials).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A page has a malformed directive.
    #[error("{}: {source}", .page.display())]
    Directive {
        /// Source page.
        page: PathBuf,
        /// Parse error.
        #[source]
        source: DirectiveError,
    },

    /// A directive could not be rendered.
    #[error("{}:{line}: :::{directive} failed: {source}", .page.display())]
    Render {
        /// Source page.
        page: PathBuf,
        /// Line of the directive opening.
        line: usize,
        /// Directive name.
        directive: String,
        /// Render error.
        #[source]
        source: RenderError,
    },

    /// The inventory of a directive cannot be set up.
    #[error("inventory for :::{directive} unavailable: {source}")]
    Inventory {
        /// Directive name.
        directive: String,
        /// Inventory error.
        #[source]
        source: InventoryError,
    },

    /// A stylesheet cannot be copied.
    #[error("stylesheet {} for :::{directive} cannot be copied: {source}", .path.display())]
    Asset {
        /// Directive name.
        directive: String,
        /// Source stylesheet.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
