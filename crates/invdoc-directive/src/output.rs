//! Directive output types.

/// Output of a [`BlockDirective`](crate::BlockDirective).
///
/// - [`Html`](Self::Html): replaces the whole block, body included. The body
///   is consumed and never reaches the Markdown renderer.
/// - [`Skip`](Self::Skip): the handler declines and the block passes through
///   unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveOutput {
    /// HTML block emitted in place of the directive.
    Html(String),
    /// Leave the directive as written.
    Skip,
}

impl DirectiveOutput {
    /// Create an HTML output.
    #[must_use]
    pub fn html(s: impl Into<String>) -> Self {
        Self::Html(s.into())
    }
}
