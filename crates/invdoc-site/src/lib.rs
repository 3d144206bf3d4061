//! Static site generation with inventory directives.
//!
//! Pages are Markdown files. A directive block such as
//!
//! ```markdown
//! :::chefserver
//! fqdn = web01.example.com
//! :::
//! ```
//!
//! is rendered in two phases: directive preprocessing replaces the block by
//! a placeholder ([`InventoryDirective`]), and after Markdown rendering each
//! placeholder is resolved by loading its template ([`TemplateLoader`]),
//! fetching the node from the inventory, and rendering the template with
//! mustache ([`render_placeholder`]).
//!
//! [`SiteBuilder`] runs the whole pipeline over a source directory.

mod assets;
mod builder;
mod error;
mod inventory_directive;
mod page;
mod render;
mod template;

pub use assets::{AssetCopier, PageStylesheets, STATIC_DIR};
pub use builder::{BuildReport, InventoryFactory, SiteBuilder, chef_inventory};
pub use error::BuildError;
pub use inventory_directive::{InventoryDirective, Placeholder};
pub use render::{
    NODE_KEY, RenderError, TEMPLATE_KEY, render_placeholder, render_template, template_file_name,
};
pub use template::{FsTemplateLoader, TemplateError, TemplateLoader};
