//! Block directive trait.

use crate::{DirectiveContext, DirectiveError, DirectiveOutput};

/// Handler for a block directive: `:::name`, a raw body, then `:::`.
///
/// Block directives take no arguments on the opening line. The body lines
/// are passed exactly as written (indentation included).
///
/// # Example
///
/// ```
/// use invdoc_directive::{BlockDirective, DirectiveContext, DirectiveError, DirectiveOutput};
///
/// struct LineCount;
///
/// impl BlockDirective for LineCount {
///     fn name(&self) -> &str { "count" }
///
///     fn process(
///         &mut self,
///         body: &[&str],
///         _ctx: &DirectiveContext,
///     ) -> Result<DirectiveOutput, DirectiveError> {
///         Ok(DirectiveOutput::html(format!("<p>{} lines</p>", body.len())))
///     }
/// }
/// ```
pub trait BlockDirective {
    /// Directive name (e.g. `"chefserver"` for `:::chefserver`).
    fn name(&self) -> &str;

    /// Process one occurrence.
    ///
    /// # Errors
    ///
    /// Any error aborts processing of the document.
    fn process(
        &mut self,
        body: &[&str],
        ctx: &DirectiveContext,
    ) -> Result<DirectiveOutput, DirectiveError>;

    /// Non-fatal problems noticed while processing.
    fn warnings(&self) -> &[String] {
        &[]
    }
}
