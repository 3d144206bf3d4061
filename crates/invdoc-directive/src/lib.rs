//! Block directive preprocessing for invdoc.
//!
//! Documents embed inventory lookups as block directives whose body is a
//! small INI fragment:
//!
//! ```markdown
//! :::chefserver
//! fqdn = web01.example.com
//! filename = database
//! :::
//! ```
//!
//! [`DirectiveProcessor`] finds these blocks (ignoring fenced code) and hands
//! each body to a [`BlockDirective`]. Handlers usually read the body with a
//! [`BodyParser`] and emit a placeholder, which is later swapped for the
//! rendered output with [`Replacements`].

mod block;
mod context;
mod error;
mod fence;
mod ini;
mod output;
mod parser;
mod processor;
mod replacements;

pub use block::BlockDirective;
pub use context::DirectiveContext;
pub use error::DirectiveError;
pub use ini::{BodyParser, DirectiveConfig, IniError, ParsedBody, RequiredKeyPolicy, read_section};
pub use output::DirectiveOutput;
pub use processor::DirectiveProcessor;
pub use replacements::Replacements;
