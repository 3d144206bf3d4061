//! INI reader for directive bodies.
//!
//! A directive body is a list of `key = value` lines. It is read by wrapping
//! it in a single `[section]` header and flattening that section into a
//! [`DirectiveConfig`].
//!
//! The dialect is the raw one (no interpolation):
//!
//! - blank lines and lines starting with `#` or `;` are ignored, as are
//!   lines whose first word is `rem`
//! - `key = value` and `key: value`, split at the first delimiter
//! - keys are lower-cased, keys and values are trimmed
//! - ` ;comment` after a value is dropped, and `""` reads as empty
//! - indented lines continue the previous value (joined with a newline)
//! - `[other]` switches section; keys outside the directive's section are
//!   read but not returned, except those of `[DEFAULT]`, which the section
//!   inherits and may override
//! - a repeated key keeps the last value

use std::collections::BTreeMap;

use crate::DirectiveError;

/// Flat key/value configuration read from one directive body.
///
/// Iteration is sorted by key, so rendering the same body twice always
/// walks the entries in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveConfig {
    entries: BTreeMap<String, String>,
}

impl DirectiveConfig {
    /// Get a value by (lower-case) key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the body declared no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys from `required` that are absent, in the order given.
    #[must_use]
    pub fn missing_keys<'k>(&self, required: &'k [String]) -> Vec<&'k str> {
        required
            .iter()
            .map(String::as_str)
            .filter(|key| !self.contains_key(key))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DirectiveConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Malformed INI line.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("line {line}: expected 'key = value' or '[section]', found {text:?}")]
pub struct IniError {
    /// Line number (1-indexed).
    pub line: usize,
    /// The offending line.
    pub text: String,
}

/// What to do when a required key is missing from a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequiredKeyPolicy {
    /// Fail with [`DirectiveError::MissingKey`].
    #[default]
    Strict,
    /// Accept the body and report the missing keys.
    Warn,
}

/// Section whose keys every other section inherits. Case-sensitive.
const DEFAULT_SECTION: &str = "DEFAULT";

/// Read `lines` as the body of `[section]` and flatten that section.
///
/// The body is dedented by its common leading whitespace first, so bodies
/// indented under a list item read the same as top-level ones.
///
/// # Errors
///
/// Returns [`IniError`] with a body-relative line number for any line that
/// is neither a comment, a section header, an option, nor a continuation.
pub fn read_section(section: &str, lines: &[&str]) -> Result<DirectiveConfig, IniError> {
    let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut current = section.to_owned();
    let mut last_key: Option<String> = None;

    for (idx, line) in dedent(lines).into_iter().enumerate() {
        if line.trim().is_empty() || line.starts_with(['#', ';']) || is_rem_comment(line) {
            continue;
        }

        if line.starts_with(char::is_whitespace)
            && let Some(key) = &last_key
        {
            let extra = line.trim();
            if !extra.is_empty()
                && let Some(value) = sections.get_mut(&current).and_then(|s| s.get_mut(key))
            {
                value.push('\n');
                value.push_str(extra);
            }
            continue;
        }

        if let Some(name) = parse_section_header(line) {
            current = name.to_owned();
            last_key = None;
            continue;
        }

        let Some((key, value)) = parse_option(line) else {
            return Err(IniError {
                line: idx + 1,
                text: line.to_owned(),
            });
        };

        sections
            .entry(current.clone())
            .or_default()
            .insert(key.clone(), value);
        last_key = Some(key);
    }

    let mut entries = sections.remove(DEFAULT_SECTION).unwrap_or_default();
    if section != DEFAULT_SECTION
        && let Some(own) = sections.remove(section)
    {
        entries.extend(own);
    }
    Ok(DirectiveConfig { entries })
}

/// Remove the whitespace prefix shared by all non-blank lines.
fn dedent<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.get(indent..).unwrap_or_else(|| l.trim_start())
            }
        })
        .collect()
}

/// `rem` comment lines, a leftover of Windows INI files.
fn is_rem_comment(line: &str) -> bool {
    line.starts_with(['r', 'R'])
        && line
            .split_whitespace()
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case("rem"))
}

/// `[name]` at the start of a line; anything after `]` is ignored.
fn parse_section_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    (end > 0).then(|| &rest[..end])
}

/// Split `key = value` / `key: value` at the first delimiter.
fn parse_option(line: &str) -> Option<(String, String)> {
    let first = line.chars().next()?;
    if first == '=' || first == ':' || first.is_whitespace() {
        return None;
    }

    let delim = line.find(['=', ':'])?;
    let key = line[..delim].trim_end().to_lowercase();
    let mut value = line[delim + 1..].trim_start();

    if let Some(pos) = value.find(';')
        && pos > 0
        && value[..pos].ends_with(char::is_whitespace)
    {
        value = &value[..pos];
    }

    let value = value.trim();
    let value = if value == "\"\"" { "" } else { value };
    Some((key, value.to_owned()))
}

/// Parsed directive body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBody {
    /// Flattened configuration.
    pub config: DirectiveConfig,
    /// Required keys that were absent (only under [`RequiredKeyPolicy::Warn`]).
    pub missing_keys: Vec<String>,
}

/// Reads the body of one kind of directive and checks its required keys.
///
/// # Example
///
/// ```
/// use invdoc_directive::{BodyParser, RequiredKeyPolicy};
///
/// let parser = BodyParser::new("chefserver", "server")
///     .with_required_keys(vec!["fqdn".to_owned()])
///     .with_policy(RequiredKeyPolicy::Strict);
///
/// let body = parser.parse(&["fqdn = web01.example.com"], 3).unwrap();
/// assert_eq!(body.config.get("fqdn"), Some("web01.example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct BodyParser {
    directive: String,
    section: String,
    required_keys: Vec<String>,
    policy: RequiredKeyPolicy,
}

impl BodyParser {
    /// Create a parser for `directive` bodies wrapped in `[section]`.
    #[must_use]
    pub fn new(directive: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            section: section.into(),
            required_keys: Vec::new(),
            policy: RequiredKeyPolicy::default(),
        }
    }

    /// Set the keys every body must declare.
    #[must_use]
    pub fn with_required_keys(mut self, keys: Vec<String>) -> Self {
        self.required_keys = keys;
        self
    }

    /// Set the missing-key policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RequiredKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parse a body whose opening `:::` line is `open_line` in the document.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError::Ini`] for malformed bodies (line numbers are
    /// document lines) and [`DirectiveError::MissingKey`] for the first absent
    /// required key under [`RequiredKeyPolicy::Strict`].
    pub fn parse(&self, body: &[&str], open_line: usize) -> Result<ParsedBody, DirectiveError> {
        let config = read_section(&self.section, body).map_err(|e| DirectiveError::Ini {
            directive: self.directive.clone(),
            source: IniError {
                line: e.line + open_line,
                text: e.text,
            },
        })?;

        let missing: Vec<String> = config
            .missing_keys(&self.required_keys)
            .into_iter()
            .map(str::to_owned)
            .collect();

        match (self.policy, missing.first()) {
            (RequiredKeyPolicy::Strict, Some(key)) => Err(DirectiveError::MissingKey {
                directive: self.directive.clone(),
                key: key.clone(),
                line: open_line,
            }),
            _ => Ok(ParsedBody {
                config,
                missing_keys: missing,
            }),
        }
    }
}
