//! Directive processing context.

use std::path::Path;

/// Source location handed to a [`BlockDirective`](crate::BlockDirective).
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use invdoc_directive::DirectiveContext;
///
/// let ctx = DirectiveContext {
///     source_path: Some(Path::new("docs/servers.md")),
///     line: 12,
/// };
/// assert_eq!(ctx.location(), "docs/servers.md:12");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DirectiveContext<'a> {
    /// Path to the document being processed (if known).
    pub source_path: Option<&'a Path>,
    /// Line of the `:::name` opening (1-indexed).
    pub line: usize,
}

impl DirectiveContext<'_> {
    /// `path:line` for log messages, or `line N` without a path.
    #[must_use]
    pub fn location(&self) -> String {
        match self.source_path {
            Some(path) => format!("{}:{}", path.display(), self.line),
            None => format!("line {}", self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_without_path() {
        let ctx = DirectiveContext {
            source_path: None,
            line: 3,
        };
        assert_eq!(ctx.location(), "line 3");
    }
}
