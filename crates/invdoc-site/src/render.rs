//! Inventory directive: render phase.

use invdoc_config::DirectiveSettings;
use invdoc_directive::DirectiveConfig;
use invdoc_inventory::{Inventory, InventoryError, NodeSnapshot, Session};
use serde_json::Value;

use crate::inventory_directive::Placeholder;
use crate::template::{TemplateError, TemplateLoader};

/// Body key naming the node to fetch.
pub const NODE_KEY: &str = "fqdn";

/// Body key overriding the template name.
pub const TEMPLATE_KEY: &str = "filename";

/// Extension appended to template names.
const TEMPLATE_EXTENSION: &str = ".html";

/// Error rendering one placeholder.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template lookup failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Inventory session or fetch failed.
    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),
    /// Template syntax or evaluation error.
    #[error("template {template} cannot be rendered: {source}")]
    Engine {
        /// Template file name.
        template: String,
        /// Mustache error.
        #[source]
        source: mustache::Error,
    },
    /// The body names no node (only possible with `strict = false`).
    #[error("no 'fqdn' key in directive body")]
    MissingNodeName,
}

/// File name of the template for a directive body: the `filename` key, or
/// the instance default, plus `.html`.
#[must_use]
pub fn template_file_name(config: &DirectiveConfig, settings: &DirectiveSettings) -> String {
    let stem = config
        .get(TEMPLATE_KEY)
        .unwrap_or(settings.default_template.as_str());
    format!("{stem}{TEMPLATE_EXTENSION}")
}

/// Render one placeholder: load its template, fetch its node inside a
/// scoped session, and render.
///
/// The session is closed before returning, on every path.
///
/// # Errors
///
/// Returns the first failure; nothing is retried.
pub fn render_placeholder(
    placeholder: &Placeholder,
    settings: &DirectiveSettings,
    loader: &dyn TemplateLoader,
    inventory: &dyn Inventory,
) -> Result<String, RenderError> {
    let name = template_file_name(&placeholder.config, settings);
    let source = loader.load(&name, &settings.templates)?;

    let node_name = placeholder
        .config
        .get(NODE_KEY)
        .ok_or(RenderError::MissingNodeName)?;
    let node = {
        let mut session = Session::open(inventory)?;
        session.node(node_name)?
    };

    tracing::debug!(
        directive = %placeholder.directive,
        template = %name,
        node = %node.name,
        "Rendering directive"
    );
    render_template(&name, &source, &node, &placeholder.config)
}

/// Render mustache template text against a node.
///
/// The context holds the node's merged attributes at top level plus
/// `name`, `chef_environment`, `run_list`, `attributes` and `directive`
/// (the directive body). `{{var}}` output is HTML-escaped; `{{{var}}}` is
/// not.
///
/// # Errors
///
/// Returns [`RenderError::Engine`] for template syntax and output errors.
pub fn render_template(
    name: &str,
    source: &str,
    node: &NodeSnapshot,
    config: &DirectiveConfig,
) -> Result<String, RenderError> {
    let engine_error = |source: mustache::Error| RenderError::Engine {
        template: name.to_owned(),
        source,
    };
    let template = mustache::compile_str(source).map_err(engine_error)?;

    let mut context = node.to_context();
    if let Value::Object(map) = &mut context {
        let directive = config
            .iter()
            .map(|(k, v)| (k.to_owned(), Value::from(v)))
            .collect();
        map.insert("directive".to_owned(), Value::Object(directive));
    }

    let mut out = Vec::new();
    template.render(&mut out, &context).map_err(engine_error)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use super::*;
    use invdoc_inventory::MemoryInventory;
    use pretty_assertions::assert_eq;

    /// Serves templates from memory and records every requested name.
    #[derive(Default)]
    struct RecordingLoader {
        templates: BTreeMap<String, String>,
        requested: RefCell<Vec<String>>,
    }

    impl RecordingLoader {
        fn with(mut self, name: &str, source: &str) -> Self {
            self.templates.insert(name.to_owned(), source.to_owned());
            self
        }
    }

    impl TemplateLoader for RecordingLoader {
        fn load(&self, name: &str, search_path: &[PathBuf]) -> Result<String, TemplateError> {
            self.requested.borrow_mut().push(name.to_owned());
            self.templates
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::NotFound {
                    name: name.to_owned(),
                    search_path: search_path.to_vec(),
                })
        }
    }

    fn settings() -> DirectiveSettings {
        DirectiveSettings::with_defaults("chefserver", Path::new("/site"))
    }

    fn placeholder(body: &[(&str, &str)]) -> Placeholder {
        Placeholder {
            id: 0,
            directive: "chefserver".to_owned(),
            line: 1,
            config: body.iter().copied().collect(),
        }
    }

    fn inventory() -> MemoryInventory {
        MemoryInventory::new().with_node(
            NodeSnapshot::new("web01.example.com")
                .with_environment("production")
                .with_run_list_entry("role[web]")
                .with_attribute("platform", "ubuntu")
                .with_attribute("ipaddress", "10.0.0.5"),
        )
    }

    #[test]
    fn test_default_template_requested() {
        let loader = RecordingLoader::default().with("server.html", "{{name}}");
        let out = render_placeholder(
            &placeholder(&[("fqdn", "web01.example.com")]),
            &settings(),
            &loader,
            &inventory(),
        )
        .unwrap();

        assert_eq!(out, "web01.example.com");
        assert_eq!(*loader.requested.borrow(), vec!["server.html".to_owned()]);
    }

    #[test]
    fn test_filename_overrides_template() {
        let loader = RecordingLoader::default().with("custom.html", "{{platform}}");
        let out = render_placeholder(
            &placeholder(&[("fqdn", "web01.example.com"), ("filename", "custom")]),
            &settings(),
            &loader,
            &inventory(),
        )
        .unwrap();

        assert_eq!(out, "ubuntu");
        assert_eq!(*loader.requested.borrow(), vec!["custom.html".to_owned()]);
    }

    #[test]
    fn test_context_fields() {
        let source = "{{chef_environment}}|{{#run_list}}{{.}};{{/run_list}}|{{attributes.ipaddress}}|{{directive.fqdn}}";
        let loader = RecordingLoader::default().with("server.html", source);
        let out = render_placeholder(
            &placeholder(&[("fqdn", "web01.example.com")]),
            &settings(),
            &loader,
            &inventory(),
        )
        .unwrap();

        assert_eq!(out, "production|role[web];|10.0.0.5|web01.example.com");
    }

    #[test]
    fn test_render_twice_identical() {
        let source = "{{name}}: {{#attributes}}{{platform}}/{{ipaddress}}{{/attributes}}";
        let loader = RecordingLoader::default().with("server.html", source);
        let placeholder = placeholder(&[("fqdn", "web01.example.com")]);
        let inventory = inventory();

        let first = render_placeholder(&placeholder, &settings(), &loader, &inventory).unwrap();
        let second = render_placeholder(&placeholder, &settings(), &loader, &inventory).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "web01.example.com: ubuntu/10.0.0.5");
    }

    #[test]
    fn test_output_is_escaped() {
        let node = NodeSnapshot::new("web01").with_attribute("motd", "<b>hi & bye");
        let out = render_template("server.html", "{{motd}}", &node, &DirectiveConfig::default())
            .unwrap();
        assert_eq!(out, "&lt;b&gt;hi &amp; bye");
    }

    #[test]
    fn test_missing_template_skips_inventory() {
        let loader = RecordingLoader::default();
        let inventory = inventory();
        let err = render_placeholder(
            &placeholder(&[("fqdn", "web01.example.com")]),
            &settings(),
            &loader,
            &inventory,
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::Template(TemplateError::NotFound { .. })));
        assert_eq!(inventory.opened(), 0);
    }

    #[test]
    fn test_unknown_node_closes_session() {
        let loader = RecordingLoader::default().with("server.html", "{{name}}");
        let inventory = inventory();
        let err = render_placeholder(
            &placeholder(&[("fqdn", "ghost.example.com")]),
            &settings(),
            &loader,
            &inventory,
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::Inventory(InventoryError::NodeNotFound(_))));
        assert_eq!(inventory.opened(), 1);
        assert_eq!(inventory.closed(), 1);
    }

    #[test]
    fn test_missing_node_name() {
        let loader = RecordingLoader::default().with("server.html", "{{name}}");
        let err = render_placeholder(&placeholder(&[]), &settings(), &loader, &inventory())
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingNodeName));
    }

    #[test]
    fn test_triple_mustache_not_escaped() {
        let node = NodeSnapshot::new("web01").with_attribute("motd", "<b>hi</b>");
        let out = render_template("server.html", "{{{motd}}}", &node, &DirectiveConfig::default())
            .unwrap();
        assert_eq!(out, "<b>hi</b>");
    }

    #[test]
    fn test_list_section() {
        let node = NodeSnapshot::new("web01")
            .with_run_list_entry("role[web]")
            .with_run_list_entry("recipe[nginx]");
        let out = render_template(
            "server.html",
            "<ul>{{#run_list}}<li>{{.}}</li>{{/run_list}}</ul>",
            &node,
            &DirectiveConfig::default(),
        )
        .unwrap();
        assert_eq!(out, "<ul><li>role[web]</li><li>recipe[nginx]</li></ul>");
    }

    #[test]
    fn test_inverted_section_for_empty_list() {
        let node = NodeSnapshot::new("web01");
        let out = render_template(
            "server.html",
            "{{#run_list}}{{.}}{{/run_list}}{{^run_list}}none{{/run_list}}",
            &node,
            &DirectiveConfig::default(),
        )
        .unwrap();
        assert_eq!(out, "none");
    }

    #[test]
    fn test_syntax_error() {
        let node = NodeSnapshot::new("web01");
        let err = render_template(
            "server.html",
            "{{#run_list}}unclosed",
            &node,
            &DirectiveConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Engine { ref template, .. } if template == "server.html"));
    }
}
