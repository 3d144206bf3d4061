//! Error types for directive preprocessing.

use crate::ini::IniError;

/// Error raised while collecting directives from a document.
///
/// Every variant aborts the build of the page it occurs in.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DirectiveError {
    /// The directive body is not valid INI.
    #[error(":::{directive} body is malformed: {source}")]
    Ini {
        /// Directive name.
        directive: String,
        /// Reader error, with a line number relative to the document.
        #[source]
        source: IniError,
    },

    /// A required body key is absent.
    #[error(":::{directive} at line {line} is missing required key '{key}'")]
    MissingKey {
        /// Directive name.
        directive: String,
        /// The missing key.
        key: String,
        /// Line of the directive opening (1-indexed).
        line: usize,
    },

    /// The opening line carries `[content]` or `{attrs}`.
    #[error(":::{directive} at line {line} takes no arguments")]
    UnexpectedArguments {
        /// Directive name.
        directive: String,
        /// Line of the directive opening (1-indexed).
        line: usize,
    },

    /// End of document reached before the closing `:::`.
    #[error(":::{directive} at line {line} is never closed (missing closing :::)")]
    Unclosed {
        /// Directive name.
        directive: String,
        /// Line of the directive opening (1-indexed).
        line: usize,
    },
}
