//! Static site builder.
//!
//! Each page goes through directive preprocessing, Markdown rendering,
//! placeholder rendering and the page shell, in that order. Pages and
//! placeholders are processed sequentially.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use invdoc_config::{Config, ConfigError, DirectiveSettings};
use invdoc_directive::{DirectiveProcessor, Replacements};
use invdoc_inventory::{ChefServer, Inventory};
use pulldown_cmark::{Options, Parser};

use crate::assets::{AssetCopier, PageStylesheets, STATIC_DIR};
use crate::error::BuildError;
use crate::inventory_directive::InventoryDirective;
use crate::page::{PageData, extract_title, render_page};
use crate::render::render_placeholder;
use crate::template::{FsTemplateLoader, TemplateLoader};

/// Helper directories never scanned for pages.
const SKIPPED_DIRS: &[&str] = &["_templates", STATIC_DIR];

/// Creates the inventory of a directive instance.
pub type InventoryFactory =
    dyn Fn(&DirectiveSettings) -> Result<Arc<dyn Inventory>, BuildError>;

/// Summary of a finished build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages written.
    pub pages: usize,
    /// Directive occurrences rendered.
    pub directives: usize,
    /// Stylesheets copied.
    pub assets: usize,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
}

/// Mutable state of one build.
struct BuildState {
    assets: AssetCopier,
    inventories: BTreeMap<String, Arc<dyn Inventory>>,
    report: BuildReport,
}

/// Builds a static HTML site from a directory of Markdown pages.
///
/// # Example
///
/// ```ignore
/// let config = Config::load(None, None)?;
/// let report = SiteBuilder::new(&config).build()?;
/// println!("{} pages", report.pages);
/// ```
pub struct SiteBuilder<'c> {
    config: &'c Config,
    loader: Box<dyn TemplateLoader>,
    inventory_factory: Box<InventoryFactory>,
}

impl<'c> SiteBuilder<'c> {
    /// Create a builder using file system templates and Chef servers.
    #[must_use]
    pub fn new(config: &'c Config) -> Self {
        Self {
            config,
            loader: Box::new(FsTemplateLoader),
            inventory_factory: Box::new(chef_inventory),
        }
    }

    /// Replace the template loader.
    #[must_use]
    pub fn with_template_loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Replace how inventories are created.
    ///
    /// The factory is called at most once per directive instance and build,
    /// and only for instances that occur on some page.
    #[must_use]
    pub fn with_inventory_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&DirectiveSettings) -> Result<Arc<dyn Inventory>, BuildError> + 'static,
    {
        self.inventory_factory = Box::new(factory);
        self
    }

    /// Build from the configured source directory into the configured
    /// output directory.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; the output may be partial.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let docs = &self.config.docs_resolved;
        self.build_to(&docs.source_dir, &docs.output_dir)
    }

    /// Build `source_dir` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; the output may be partial.
    pub fn build_to(&self, source_dir: &Path, output_dir: &Path) -> Result<BuildReport, BuildError> {
        tracing::info!(
            source = %source_dir.display(),
            output = %output_dir.display(),
            "Building site"
        );

        let pages = collect_pages(source_dir, output_dir)?;
        std::fs::create_dir_all(output_dir).map_err(BuildError::io(output_dir))?;

        let mut state = BuildState {
            assets: AssetCopier::new(output_dir),
            inventories: BTreeMap::new(),
            report: BuildReport::default(),
        };

        for page in &pages {
            self.build_page(source_dir, output_dir, page, &mut state)?;
        }

        let mut report = state.report;
        report.assets = state.assets.copied();
        tracing::info!(
            pages = report.pages,
            directives = report.directives,
            assets = report.assets,
            "Site built"
        );
        Ok(report)
    }

    fn build_page(
        &self,
        source_dir: &Path,
        output_dir: &Path,
        rel: &Path,
        state: &mut BuildState,
    ) -> Result<(), BuildError> {
        let source_path = source_dir.join(rel);
        let markdown =
            std::fs::read_to_string(&source_path).map_err(BuildError::io(&source_path))?;
        tracing::debug!(page = %rel.display(), "Building page");

        let mut handlers: Vec<InventoryDirective<'_>> = self
            .config
            .directives_resolved
            .iter()
            .map(InventoryDirective::new)
            .collect();

        let preprocessed = {
            let mut processor = DirectiveProcessor::new().with_source_path(rel);
            for handler in &mut handlers {
                processor = processor.with_block(handler);
            }
            let output = processor
                .process(&markdown)
                .map_err(|source| BuildError::Directive {
                    page: rel.to_path_buf(),
                    source,
                })?;
            state.report.warnings.extend(processor.warnings());
            output
        };

        let mut html = markdown_to_html(&preprocessed);
        let mut replacements = Replacements::new();
        let mut stylesheets = PageStylesheets::default();

        for handler in &mut handlers {
            let placeholders = handler.take_placeholders();
            if placeholders.is_empty() {
                continue;
            }
            let settings = handler.settings();
            let mut rendered_any = false;

            for placeholder in &placeholders {
                let marker = placeholder.marker();
                if !html.contains(&marker) {
                    state.report.warnings.push(format!(
                        "{}:{}: :::{} is not at block level and was not rendered",
                        rel.display(),
                        placeholder.line,
                        placeholder.directive
                    ));
                    continue;
                }

                let inventory = self.inventory_for(settings, &mut state.inventories)?;
                let rendered = render_placeholder(
                    placeholder,
                    settings,
                    self.loader.as_ref(),
                    inventory.as_ref(),
                )
                .map_err(|source| BuildError::Render {
                    page: rel.to_path_buf(),
                    line: placeholder.line,
                    directive: placeholder.directive.clone(),
                    source,
                })?;
                replacements.add(marker, rendered);
                state.report.directives += 1;
                rendered_any = true;
            }

            if rendered_any {
                state.assets.copy(settings)?;
                stylesheets.add(settings);
            }
        }
        replacements.apply(&mut html);

        let depth = rel.components().count().saturating_sub(1);
        let stem = rel
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let page = PageData {
            title: extract_title(&markdown, &stem),
            html_content: html,
            stylesheets: stylesheets.hrefs(depth),
        };

        let output_path = output_dir.join(rel).with_extension("html");
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
        }
        std::fs::write(&output_path, render_page(&page)).map_err(BuildError::io(&output_path))?;

        state.report.pages += 1;
        Ok(())
    }

    fn inventory_for(
        &self,
        settings: &DirectiveSettings,
        cache: &mut BTreeMap<String, Arc<dyn Inventory>>,
    ) -> Result<Arc<dyn Inventory>, BuildError> {
        if let Some(inventory) = cache.get(&settings.name) {
            return Ok(Arc::clone(inventory));
        }
        let inventory = (self.inventory_factory)(settings)?;
        cache.insert(settings.name.clone(), Arc::clone(&inventory));
        Ok(inventory)
    }
}

/// Default inventory factory: a Chef server from the instance's
/// `[directives.inventory]` table.
///
/// # Errors
///
/// Returns [`BuildError::Config`] for incomplete credentials and
/// [`BuildError::Inventory`] if the client key cannot be loaded.
pub fn chef_inventory(settings: &DirectiveSettings) -> Result<Arc<dyn Inventory>, BuildError> {
    let inventory = settings.require_inventory()?;
    let Some(key_file) = inventory.key_file.as_deref() else {
        return Err(ConfigError::Validation(format!(
            "directives.{}.inventory.key_file must be set",
            settings.name
        ))
        .into());
    };

    let server = ChefServer::from_config(&inventory.url, key_file, &inventory.login).map_err(
        |source| BuildError::Inventory {
            directive: settings.name.clone(),
            source,
        },
    )?;
    Ok(Arc::new(server))
}

/// Render Markdown to HTML with the extensions used for pages.
fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS;
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, Parser::new_ext(markdown, options));
    html
}

/// Markdown pages below `root`, relative to it and sorted.
///
/// Hidden directories, helper directories and `exclude` (the output
/// directory, when it lives inside the sources) are skipped.
fn collect_pages(root: &Path, exclude: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let exclude = exclude.canonicalize().ok();
    let mut pages = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(BuildError::io(&dir))?;
        for entry in entries {
            let entry = entry.map_err(BuildError::io(&dir))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(BuildError::io(&path))?;

            if file_type.is_dir() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                let excluded = exclude
                    .as_ref()
                    .is_some_and(|ex| path.canonicalize().is_ok_and(|p| &p == ex));
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) || excluded {
                    continue;
                }
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "md")
                && let Ok(rel) = path.strip_prefix(root)
            {
                pages.push(rel.to_path_buf());
            }
        }
    }

    pages.sort();
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invdoc_inventory::{MemoryInventory, NodeSnapshot};
    use pretty_assertions::assert_eq;

    struct Site {
        _dir: tempfile::TempDir,
        root: PathBuf,
        config: Config,
    }

    impl Site {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            std::fs::create_dir_all(root.join("docs")).unwrap();
            std::fs::create_dir_all(root.join("_templates")).unwrap();
            std::fs::create_dir_all(root.join("_static")).unwrap();
            std::fs::write(
                root.join("_templates/server.html"),
                "<table class=\"server\"><tr><td>{{name}}</td><td>{{platform}}</td></tr></table>",
            )
            .unwrap();
            std::fs::write(root.join("_static/chefserver.css"), ".server {}").unwrap();

            let mut settings = DirectiveSettings::with_defaults("chefserver", &root);
            settings.section = "server".to_owned();

            let mut config = Config::default();
            config.docs_resolved.source_dir = root.join("docs");
            config.docs_resolved.output_dir = root.join("site");
            config.directives_resolved = vec![settings];

            Self {
                _dir: dir,
                root,
                config,
            }
        }

        fn page(&self, rel: &str, content: &str) {
            let path = self.root.join("docs").join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn output(&self, rel: &str) -> String {
            std::fs::read_to_string(self.root.join("site").join(rel)).unwrap()
        }
    }

    fn inventory() -> Arc<MemoryInventory> {
        Arc::new(
            MemoryInventory::new().with_node(
                NodeSnapshot::new("web01.example.com").with_attribute("platform", "ubuntu"),
            ),
        )
    }

    fn builder<'c>(config: &'c Config, inventory: &Arc<MemoryInventory>) -> SiteBuilder<'c> {
        let shared = Arc::clone(inventory);
        SiteBuilder::new(config)
            .with_inventory_factory(move |_| Ok(Arc::clone(&shared) as Arc<dyn Inventory>))
    }

    #[test]
    fn test_build_renders_directive() {
        let site = Site::new();
        site.page(
            "index.md",
            "# Web tier\n\nHosts:\n\n:::chefserver\nfqdn = web01.example.com\n:::\n\nDone.\n",
        );
        let inventory = inventory();

        let report = builder(&site.config, &inventory).build().unwrap();

        assert_eq!(
            report,
            BuildReport {
                pages: 1,
                directives: 1,
                assets: 1,
                warnings: vec![],
            }
        );
        let html = site.output("index.html");
        assert!(html.contains("<title>Web tier</title>"));
        assert!(html.contains(
            "<table class=\"server\"><tr><td>web01.example.com</td><td>ubuntu</td></tr></table>"
        ));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"_static/chefserver.css\">"));
        assert!(html.contains("<p>Done.</p>"));
        assert!(!html.contains("invdoc-placeholder"));
        assert!(!html.contains("fqdn"));
        assert_eq!(site.output("_static/chefserver.css"), ".server {}");
        assert_eq!(inventory.opened(), 1);
        assert_eq!(inventory.closed(), 1);
    }

    #[test]
    fn test_page_without_directive() {
        let site = Site::new();
        site.page("plain.md", "Just text.\n");

        let report = SiteBuilder::new(&site.config)
            .with_inventory_factory(|_| panic!("inventory must not be created"))
            .build()
            .unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.assets, 0);
        let html = site.output("plain.html");
        assert!(html.contains("<title>plain</title>"));
        assert!(!html.contains("<link"));
        assert!(!site.root.join("site/_static").exists());
    }

    #[test]
    fn test_nested_page_links_up() {
        let site = Site::new();
        site.page(
            "hosts/web/index.md",
            ":::chefserver\nfqdn = web01.example.com\n:::\n",
        );
        let inventory = inventory();

        builder(&site.config, &inventory).build().unwrap();

        let html = site.output("hosts/web/index.html");
        assert!(html.contains("href=\"../../_static/chefserver.css\""));
    }

    #[test]
    fn test_inventory_created_once_per_build() {
        let site = Site::new();
        site.page("a.md", ":::chefserver\nfqdn = web01.example.com\n:::\n");
        site.page("b.md", ":::chefserver\nfqdn = web01.example.com\n:::\n");

        let created = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let shared = inventory();
        let report = SiteBuilder::new(&site.config)
            .with_inventory_factory(move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(Arc::clone(&shared) as Arc<dyn Inventory>)
            })
            .build()
            .unwrap();

        assert_eq!(report.directives, 2);
        assert_eq!(created.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_template_aborts() {
        let site = Site::new();
        site.page(
            "index.md",
            ":::chefserver\nfqdn = web01.example.com\nfilename = missing\n:::\n",
        );
        let inventory = inventory();

        let err = builder(&site.config, &inventory).build().unwrap_err();

        assert!(matches!(err, BuildError::Render { line: 1, ref directive, .. } if directive == "chefserver"));
        assert!(err.to_string().contains("missing.html"));
    }

    #[test]
    fn test_malformed_body_aborts() {
        let site = Site::new();
        site.page("index.md", "text\n\n:::chefserver\nnot ini\n:::\n");
        let inventory = inventory();

        let err = builder(&site.config, &inventory).build().unwrap_err();

        assert!(matches!(err, BuildError::Directive { ref page, .. } if page == Path::new("index.md")));
        assert_eq!(inventory.opened(), 0);
    }

    #[test]
    fn test_code_sample_not_rendered() {
        let site = Site::new();
        site.page(
            "howto.md",
            "```markdown\n:::chefserver\nfqdn = web01.example.com\n:::\n```\n",
        );
        let inventory = inventory();

        let report = builder(&site.config, &inventory).build().unwrap();

        assert_eq!(report.directives, 0);
        assert!(site.output("howto.html").contains(":::chefserver"));
    }

    #[test]
    fn test_unrendered_placeholder_adds_no_stylesheet() {
        let site = Site::new();
        site.page(
            "index.md",
            "Intro.\n\n    :::chefserver\n    fqdn = web01.example.com\n    :::\n",
        );
        let inventory = inventory();

        let report = builder(&site.config, &inventory).build().unwrap();

        assert_eq!(report.directives, 0);
        assert_eq!(report.assets, 0);
        assert_eq!(
            report.warnings,
            vec!["index.md:3: :::chefserver is not at block level and was not rendered".to_owned()]
        );
        let html = site.output("index.html");
        assert!(!html.contains("<link"));
        assert!(!site.root.join("site/_static/chefserver.css").exists());
        assert_eq!(inventory.opened(), 0);
    }

    #[test]
    fn test_collect_pages_skips_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "b.md",
            "a.md",
            "guide/intro.md",
            "notes.txt",
            ".hidden/secret.md",
            "_templates/server.md",
            "site/old.md",
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }

        let pages = collect_pages(root, &root.join("site")).unwrap();

        assert_eq!(
            pages,
            vec![
                PathBuf::from("a.md"),
                PathBuf::from("b.md"),
                PathBuf::from("guide/intro.md"),
            ]
        );
    }
}
