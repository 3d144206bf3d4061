//! Block directive syntax parsing.
//!
//! Recognizes the `:::name` opening line and the bare `:::` closing line of
//! a block directive. Everything between them is the directive body.

/// Opening line of a block directive: `:::name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockOpen {
    /// Directive name.
    pub name: String,
    /// Whether `[content]` or `{attrs}` follow the name.
    pub has_arguments: bool,
}

/// Parse a line as a block directive opening.
///
/// Returns `None` if the line is not `:::name...` (closing lines included).
pub(crate) fn parse_block_open(line: &str) -> Option<BlockOpen> {
    let trimmed = line.trim();
    if !trimmed.starts_with(":::") {
        return None;
    }

    let colon_count = trimmed.chars().take_while(|&c| c == ':').count();
    let after_colons = trimmed[colon_count..].trim_start();

    let name_end = after_colons
        .find(|c: char| c == '[' || c == '{' || c.is_whitespace())
        .unwrap_or(after_colons.len());
    let name = &after_colons[..name_end];
    if !is_valid_directive_name(name) {
        return None;
    }

    let rest = after_colons[name_end..].trim();
    Some(BlockOpen {
        name: name.to_owned(),
        has_arguments: !rest.is_empty(),
    })
}

/// Check whether a line closes a block directive (`:::` or longer).
pub(crate) fn is_block_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == ':')
}

/// Valid names contain only alphanumeric characters, hyphens, and underscores.
fn is_valid_directive_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}
