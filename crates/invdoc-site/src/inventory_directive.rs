//! Inventory directive: parse phase.
//!
//! Each `:::chefserver` (or other configured name) block is read into a
//! [`DirectiveConfig`] and replaced by a placeholder element. The render
//! stage later swaps each placeholder for the rendered template.

use invdoc_config::DirectiveSettings;
use invdoc_directive::{
    BlockDirective, BodyParser, DirectiveConfig, DirectiveContext, DirectiveError,
    DirectiveOutput, RequiredKeyPolicy,
};

/// One directive occurrence waiting to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Position among occurrences of the same directive on the page.
    pub id: usize,
    /// Directive name.
    pub directive: String,
    /// Line of the directive opening (1-indexed).
    pub line: usize,
    /// Parsed body.
    pub config: DirectiveConfig,
}

impl Placeholder {
    /// Markup left in the document.
    ///
    /// A `div` on its own line is passed through by the Markdown renderer
    /// as a raw HTML block, byte for byte.
    #[must_use]
    pub fn marker(&self) -> String {
        format!(
            "<div class=\"invdoc-placeholder\" data-directive=\"{}\" data-id=\"{}\"></div>",
            self.directive, self.id
        )
    }
}

/// [`BlockDirective`] collecting placeholders for one configured instance.
pub struct InventoryDirective<'s> {
    settings: &'s DirectiveSettings,
    parser: BodyParser,
    placeholders: Vec<Placeholder>,
    next_id: usize,
    warnings: Vec<String>,
}

impl<'s> InventoryDirective<'s> {
    /// Create a handler for `settings`.
    #[must_use]
    pub fn new(settings: &'s DirectiveSettings) -> Self {
        let policy = if settings.strict {
            RequiredKeyPolicy::Strict
        } else {
            RequiredKeyPolicy::Warn
        };
        Self {
            settings,
            parser: BodyParser::new(&settings.name, &settings.section)
                .with_required_keys(settings.required_keys.clone())
                .with_policy(policy),
            placeholders: Vec::new(),
            next_id: 0,
            warnings: Vec::new(),
        }
    }

    /// Settings of the instance.
    #[must_use]
    pub fn settings(&self) -> &'s DirectiveSettings {
        self.settings
    }

    /// Drain the placeholders collected so far, in document order.
    pub fn take_placeholders(&mut self) -> Vec<Placeholder> {
        std::mem::take(&mut self.placeholders)
    }
}

impl BlockDirective for InventoryDirective<'_> {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn process(
        &mut self,
        body: &[&str],
        ctx: &DirectiveContext,
    ) -> Result<DirectiveOutput, DirectiveError> {
        let parsed = self.parser.parse(body, ctx.line)?;

        for key in &parsed.missing_keys {
            tracing::warn!(
                directive = %self.settings.name,
                key = %key,
                location = %ctx.location(),
                "Directive is missing a required key"
            );
            self.warnings.push(format!(
                "{}: :::{} is missing required key '{key}'",
                ctx.location(),
                self.settings.name
            ));
        }

        let placeholder = Placeholder {
            id: self.next_id,
            directive: self.settings.name.clone(),
            line: ctx.line,
            config: parsed.config,
        };
        self.next_id += 1;

        let marker = placeholder.marker();
        self.placeholders.push(placeholder);
        Ok(DirectiveOutput::Html(marker))
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
