//! Single-pass placeholder substitution.

/// Collects `placeholder -> html` substitutions and applies them in one
/// pass over the document.
///
/// Substituted text is never rescanned, so rendered output that happens to
/// contain placeholder markup is left as is.
///
/// # Example
///
/// ```
/// use invdoc_directive::Replacements;
///
/// let mut html = "<p>a</p><x-1></x-1><p>b</p>".to_owned();
/// let mut replacements = Replacements::new();
/// replacements.add("<x-1></x-1>", "<table></table>");
/// replacements.apply(&mut html);
///
/// assert_eq!(html, "<p>a</p><table></table><p>b</p>");
/// ```
#[derive(Debug, Default)]
pub struct Replacements {
    items: Vec<(String, String)>,
}

impl Replacements {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a substitution. Empty patterns are ignored.
    pub fn add(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        if !from.is_empty() {
            self.items.push((from, to.into()));
        }
    }

    /// Number of registered substitutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply all substitutions to every occurrence in `html`.
    ///
    /// When two patterns match at the same position the one added first
    /// wins.
    pub fn apply(self, html: &mut String) {
        if self.items.is_empty() {
            return;
        }

        let mut out = String::with_capacity(html.len());
        let mut rest = html.as_str();

        while let Some((pos, idx)) = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(idx, (from, _))| rest.find(from.as_str()).map(|pos| (pos, idx)))
            .min()
        {
            let (from, to) = &self.items[idx];
            out.push_str(&rest[..pos]);
            out.push_str(to);
            rest = &rest[pos + from.len()..];
        }
        out.push_str(rest);

        *html = out;
    }
}
