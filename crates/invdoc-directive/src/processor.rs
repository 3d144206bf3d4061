//! Block directive preprocessing.
//!
//! Runs before pulldown-cmark: every registered `:::name` block is handed to
//! its handler and replaced by the handler's HTML.

use std::path::PathBuf;

use crate::fence::FenceTracker;
use crate::parser::{is_block_close, parse_block_open};
use crate::{BlockDirective, DirectiveContext, DirectiveError, DirectiveOutput};

/// Preprocessor for block directives.
///
/// Handlers are borrowed, so the caller keeps ownership of whatever state
/// they collect (placeholders, counters) once the document is processed.
///
/// Directive syntax inside fenced code blocks is left alone, as are blocks
/// whose name has no registered handler.
///
/// # Example
///
/// ```
/// use invdoc_directive::{
///     BlockDirective, DirectiveContext, DirectiveError, DirectiveOutput, DirectiveProcessor,
/// };
///
/// struct Note;
///
/// impl BlockDirective for Note {
///     fn name(&self) -> &str { "note" }
///     fn process(
///         &mut self,
///         body: &[&str],
///         _ctx: &DirectiveContext,
///     ) -> Result<DirectiveOutput, DirectiveError> {
///         Ok(DirectiveOutput::html(format!("<aside>{}</aside>", body.join(" "))))
///     }
/// }
///
/// let mut note = Note;
/// let mut processor = DirectiveProcessor::new().with_block(&mut note);
/// let output = processor.process("# Title\n\n:::note\nhello\n:::\n").unwrap();
/// assert_eq!(output, "# Title\n\n<aside>hello</aside>\n\n");
/// ```
#[derive(Default)]
pub struct DirectiveProcessor<'h> {
    source_path: Option<PathBuf>,
    handlers: Vec<&'h mut dyn BlockDirective>,
}

impl<'h> DirectiveProcessor<'h> {
    /// Create a processor with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source_path: None,
            handlers: Vec::new(),
        }
    }

    /// Set the path of the document being processed.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Register a block directive handler.
    #[must_use]
    pub fn with_block(mut self, handler: &'h mut dyn BlockDirective) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Preprocess a Markdown document.
    ///
    /// Line endings are preserved. HTML output is followed by a blank line so
    /// that the Markdown renderer treats it as a raw HTML block.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError::UnexpectedArguments`] when a handled block
    /// has arguments on its opening line, [`DirectiveError::Unclosed`] when
    /// it has no closing `:::`, and any error raised by a handler.
    pub fn process(&mut self, input: &str) -> Result<String, DirectiveError> {
        let lines: Vec<&str> = input.lines().collect();
        let mut output = String::with_capacity(input.len());
        let mut fence = FenceTracker::new();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            fence.update(line);

            let handler = if fence.in_fence() {
                None
            } else {
                parse_block_open(line).and_then(|open| {
                    self.handlers
                        .iter()
                        .position(|h| h.name() == open.name)
                        .map(|pos| (pos, open))
                })
            };

            let Some((pos, open)) = handler else {
                output.push_str(line);
                output.push('\n');
                idx += 1;
                continue;
            };

            let line_num = idx + 1;
            if open.has_arguments {
                return Err(DirectiveError::UnexpectedArguments {
                    directive: open.name,
                    line: line_num,
                });
            }

            let close = lines[idx + 1..]
                .iter()
                .position(|l| is_block_close(l))
                .map(|offset| idx + 1 + offset)
                .ok_or_else(|| DirectiveError::Unclosed {
                    directive: open.name.clone(),
                    line: line_num,
                })?;

            tracing::debug!(directive = %open.name, line = line_num, "Processing block directive");
            let ctx = DirectiveContext {
                source_path: self.source_path.as_deref(),
                line: line_num,
            };
            match self.handlers[pos].process(&lines[idx + 1..close], &ctx)? {
                DirectiveOutput::Html(html) => {
                    let indent = &line[..line.len() - line.trim_start().len()];
                    output.push_str(indent);
                    output.push_str(&html);
                    output.push_str("\n\n");
                }
                DirectiveOutput::Skip => {
                    for raw in &lines[idx..=close] {
                        output.push_str(raw);
                        output.push('\n');
                    }
                }
            }
            idx = close + 1;
        }

        if !input.ends_with('\n') && output.ends_with('\n') {
            output.pop();
        }

        Ok(output)
    }

    /// Warnings reported by all handlers.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.handlers
            .iter()
            .flat_map(|h| h.warnings().iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Records bodies and emits `<hr data-n="N">` per occurrence.
    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        bodies: Vec<Vec<String>>,
        lines: Vec<usize>,
        decline: bool,
        warnings: Vec<String>,
    }

    impl Recorder {
        fn named(name: &'static str) -> Self {
            Self {
                name,
                ..Self::default()
            }
        }
    }

    impl BlockDirective for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn process(
            &mut self,
            body: &[&str],
            ctx: &DirectiveContext,
        ) -> Result<DirectiveOutput, DirectiveError> {
            self.bodies
                .push(body.iter().map(|l| (*l).to_owned()).collect());
            self.lines.push(ctx.line);
            if self.decline {
                self.warnings.push(format!("declined at {}", ctx.location()));
                return Ok(DirectiveOutput::Skip);
            }
            Ok(DirectiveOutput::html(format!(
                "<hr data-n=\"{}\">",
                self.bodies.len()
            )))
        }

        fn warnings(&self) -> &[String] {
            &self.warnings
        }
    }

    #[test]
    fn test_replaces_block_and_consumes_body() {
        let mut rec = Recorder::named("chefserver");
        let output = DirectiveProcessor::new()
            .with_block(&mut rec)
            .process("Intro\n\n:::chefserver\nfqdn = web01\n:::\n\nOutro\n")
            .unwrap();

        assert_eq!(output, "Intro\n\n<hr data-n=\"1\">\n\n\nOutro\n");
        assert_eq!(rec.bodies, vec![vec!["fqdn = web01".to_owned()]]);
        assert_eq!(rec.lines, vec![3]);
    }

    #[test]
    fn test_body_passed_raw() {
        let mut rec = Recorder::named("chefserver");
        DirectiveProcessor::new()
            .with_block(&mut rec)
            .process(":::chefserver\n  fqdn = web01\n\n# comment\n:::")
            .unwrap();

        assert_eq!(
            rec.bodies[0],
            vec![
                "  fqdn = web01".to_owned(),
                String::new(),
                "# comment".to_owned()
            ]
        );
    }

    #[test]
    fn test_multiple_handlers_and_occurrences() {
        let mut chef = Recorder::named("chefserver");
        let mut zen = Recorder::named("zenserver");
        let input = ":::chefserver\na = 1\n:::\n:::zenserver\nb = 2\n:::\n:::chefserver\nc = 3\n:::\n";
        let output = DirectiveProcessor::new()
            .with_block(&mut chef)
            .with_block(&mut zen)
            .process(input)
            .unwrap();

        assert_eq!(
            output,
            "<hr data-n=\"1\">\n\n<hr data-n=\"1\">\n\n<hr data-n=\"2\">\n\n"
        );
        assert_eq!(chef.lines, vec![1, 7]);
        assert_eq!(zen.lines, vec![4]);
    }

    #[test]
    fn test_unknown_block_passes_through() {
        let mut rec = Recorder::named("chefserver");
        let input = ":::note\nText\n:::\n";
        let output = DirectiveProcessor::new()
            .with_block(&mut rec)
            .process(input)
            .unwrap();

        assert_eq!(output, input);
        assert!(rec.bodies.is_empty());
    }

    #[test]
    fn test_directive_in_code_fence_untouched() {
        let mut rec = Recorder::named("chefserver");
        let input = "```markdown\n:::chefserver\nfqdn = web01\n:::\n```\n";
        let output = DirectiveProcessor::new()
            .with_block(&mut rec)
            .process(input)
            .unwrap();

        assert_eq!(output, input);
        assert!(rec.bodies.is_empty());
    }

    #[test]
    fn test_arguments_rejected() {
        let mut rec = Recorder::named("chefserver");
        let err = DirectiveProcessor::new()
            .with_block(&mut rec)
            .process("text\n:::chefserver[web01]\nfqdn = web01\n:::\n")
            .unwrap_err();

        assert_eq!(
            err,
            DirectiveError::UnexpectedArguments {
                directive: "chefserver".to_owned(),
                line: 2,
            }
        );
    }

    #[test]
    fn test_unclosed_block() {
        let mut rec = Recorder::named("chefserver");
        let err = DirectiveProcessor::new()
            .with_block(&mut rec)
            .process(":::chefserver\nfqdn = web01\n")
            .unwrap_err();

        assert_eq!(
            err,
            DirectiveError::Unclosed {
                directive: "chefserver".to_owned(),
                line: 1,
            }
        );
    }

    #[test]
    fn test_declined_block_kept_and_warned() {
        let mut rec = Recorder {
            decline: true,
            ..Recorder::named("chefserver")
        };
        let input = ":::chefserver\nfqdn = web01\n:::";
        let mut processor = DirectiveProcessor::new()
            .with_source_path("docs/index.md")
            .with_block(&mut rec);
        let output = processor.process(input).unwrap();

        assert_eq!(output, input);
        assert_eq!(
            processor.warnings(),
            vec!["declined at docs/index.md:1".to_owned()]
        );
    }

    #[test]
    fn test_indented_directive_keeps_indent() {
        let mut rec = Recorder::named("chefserver");
        let output = DirectiveProcessor::new()
            .with_block(&mut rec)
            .process("- item\n\n  :::chefserver\n  fqdn = web01\n  :::\n")
            .unwrap();

        assert_eq!(output, "- item\n\n  <hr data-n=\"1\">\n\n");
    }

    #[test]
    fn test_no_trailing_newline_preserved() {
        let mut processor = DirectiveProcessor::new();
        assert_eq!(processor.process("a\nb").unwrap(), "a\nb");
        assert_eq!(processor.process("a\nb\n").unwrap(), "a\nb\n");
        assert_eq!(processor.process("").unwrap(), "");
    }
}
