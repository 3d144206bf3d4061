//! Configuration management for invdoc.
//!
//! Parses `invdoc.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Directive instances
//!
//! Each `[[directives]]` table declares one inventory directive: its name in
//! markdown (`:::chefserver`), the INI section header used for its body, the
//! template search path, stylesheets, and inventory credentials. When no
//! table is present the two legacy instances `chefserver` and `zenserver`
//! are configured with default paths.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `directives[].inventory.url`
//! - `directives[].inventory.key_file`
//! - `directives[].inventory.login`

mod expand;

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override site output directory.
    pub output_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "invdoc.toml";

/// Template used when a directive body has no `filename` key.
const DEFAULT_TEMPLATE: &str = "server";

/// Default template search directory, relative to the config file.
const DEFAULT_TEMPLATES_DIR: &str = "_templates";

/// Default stylesheet source directory, relative to the config file.
const DEFAULT_CSS_DIR: &str = "_static";

/// Directive body key naming the inventory node.
const DEFAULT_REQUIRED_KEY: &str = "fqdn";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Directive instances as written in the config file.
    directives: Option<Vec<DirectiveSettingsRaw>>,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved directive instances (set after loading).
    #[serde(skip)]
    pub directives_resolved: Vec<DirectiveSettings>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    output_dir: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Source directory for markdown files.
    pub source_dir: PathBuf,
    /// Directory the static site is written to.
    pub output_dir: PathBuf,
}

/// Raw directive instance as parsed from TOML.
#[derive(Debug, Deserialize)]
struct DirectiveSettingsRaw {
    name: String,
    section: Option<String>,
    templates: Option<Vec<String>>,
    default_template: Option<String>,
    css_files: Option<Vec<String>>,
    css_path: Option<String>,
    required_keys: Option<Vec<String>>,
    strict: Option<bool>,
    #[serde(default)]
    inventory: InventoryConfigRaw,
}

/// Raw inventory connection settings.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct InventoryConfigRaw {
    url: String,
    key_file: Option<String>,
    login: String,
}

/// Resolved settings of one inventory directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSettings {
    /// Directive name as written in markdown (`:::name`).
    pub name: String,
    /// INI section header wrapped around the directive body.
    pub section: String,
    /// Template search path, probed in order.
    pub templates: Vec<PathBuf>,
    /// Template name used when the body has no `filename` key.
    pub default_template: String,
    /// Stylesheets copied to `_static/` for pages using this directive.
    pub css_files: Vec<String>,
    /// Directory the stylesheets are copied from.
    pub css_path: PathBuf,
    /// Body keys that must be present.
    pub required_keys: Vec<String>,
    /// Fail on missing required keys (`false` only warns).
    pub strict: bool,
    /// Inventory connection settings.
    pub inventory: InventoryConfig,
}

impl DirectiveSettings {
    /// Settings for a directive named `name` with every path defaulted
    /// relative to `base`.
    #[must_use]
    pub fn with_defaults(name: &str, base: &Path) -> Self {
        Self {
            name: name.to_owned(),
            section: name.to_owned(),
            templates: vec![base.join(DEFAULT_TEMPLATES_DIR)],
            default_template: DEFAULT_TEMPLATE.to_owned(),
            css_files: vec![format!("{name}.css")],
            css_path: base.join(DEFAULT_CSS_DIR),
            required_keys: vec![DEFAULT_REQUIRED_KEY.to_owned()],
            strict: true,
            inventory: InventoryConfig::default(),
        }
    }

    /// Get validated inventory settings.
    ///
    /// Credentials are only checked when a build actually renders this
    /// directive, so sites that never use it build without them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the URL or login is missing.
    pub fn require_inventory(&self) -> Result<&InventoryConfig, ConfigError> {
        self.inventory.validate(&self.name)?;
        Ok(&self.inventory)
    }
}

/// Inventory server connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Inventory server base URL (e.g. `https://chef.example.com/organizations/acme`).
    pub url: String,
    /// PEM private key used to sign requests.
    pub key_file: Option<PathBuf>,
    /// Client name the key belongs to.
    pub login: String,
}

impl InventoryConfig {
    /// Validate that the connection settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or malformed.
    pub fn validate(&self, directive: &str) -> Result<(), ConfigError> {
        let field = |name: &str| format!("directives.{directive}.inventory.{name}");
        require_non_empty(&self.url, &field("url"))?;
        require_http_url(&self.url, &field("url"))?;
        require_non_empty(&self.login, &field("login"))?;
        if self.key_file.is_none() {
            return Err(ConfigError::Validation(format!(
                "{} must be set",
                field("key_file")
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`directives[0].inventory.login`").
        field: String,
        /// Error message (e.g., "${`CHEF_LOGIN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Directive names follow the markdown directive grammar.
fn is_valid_directive_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `invdoc.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Look up a directive instance by name.
    #[must_use]
    pub fn directive(&self, name: &str) -> Option<&DirectiveSettings> {
        self.directives_resolved.iter().find(|d| d.name == name)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.docs_resolved.output_dir.clone_from(output_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            directives: None,
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
                output_dir: base.join("site"),
            },
            directives_resolved: legacy_directives(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Inventory credentials are not checked here; see
    /// [`DirectiveSettings::require_inventory`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for directive in &self.directives_resolved {
            Self::validate_directive(directive)?;
            if !seen.insert(directive.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "directive '{}' is declared more than once",
                    directive.name
                )));
            }
        }
        Ok(())
    }

    fn validate_directive(directive: &DirectiveSettings) -> Result<(), ConfigError> {
        if !is_valid_directive_name(&directive.name) {
            return Err(ConfigError::Validation(format!(
                "directive name '{}' may only contain letters, digits, '-' and '_'",
                directive.name
            )));
        }
        let field = |name: &str| format!("directives.{}.{name}", directive.name);

        require_non_empty(&directive.section, &field("section"))?;
        if directive.section.contains(['[', ']']) {
            return Err(ConfigError::Validation(format!(
                "{} cannot contain brackets",
                field("section")
            )));
        }
        require_non_empty(&directive.default_template, &field("default_template"))?;
        for css in &directive.css_files {
            if css.is_empty() || css.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{} entries must be plain file names, got '{css}'",
                    field("css_files")
                )));
            }
        }
        if !directive.inventory.url.is_empty() {
            require_http_url(&directive.inventory.url, &field("inventory.url"))?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for (idx, directive) in self.directives.iter_mut().flatten().enumerate() {
            let field = |name: &str| format!("directives[{idx}].inventory.{name}");
            let inventory = &mut directive.inventory;
            inventory.url = expand::expand_env(&inventory.url, &field("url"))?;
            inventory.login = expand::expand_env(&inventory.login, &field("login"))?;
            expand::expand_opt(&mut inventory.key_file, &field("key_file"))?;
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
            output_dir: resolve(self.docs.output_dir.as_deref(), "site"),
        };

        self.directives_resolved = match &self.directives {
            Some(directives) => directives
                .iter()
                .map(|raw| resolve_directive(raw, config_dir))
                .collect(),
            None => legacy_directives(config_dir),
        };
    }
}

/// Resolve one raw directive table, falling back to defaults per field.
fn resolve_directive(raw: &DirectiveSettingsRaw, config_dir: &Path) -> DirectiveSettings {
    let defaults = DirectiveSettings::with_defaults(&raw.name, config_dir);
    DirectiveSettings {
        name: raw.name.clone(),
        section: raw.section.clone().unwrap_or(defaults.section),
        templates: raw.templates.as_ref().map_or(defaults.templates, |dirs| {
            dirs.iter().map(|d| config_dir.join(d)).collect()
        }),
        default_template: raw
            .default_template
            .clone()
            .unwrap_or(defaults.default_template),
        css_files: raw.css_files.clone().unwrap_or(defaults.css_files),
        css_path: raw
            .css_path
            .as_ref()
            .map_or(defaults.css_path, |p| config_dir.join(p)),
        required_keys: raw.required_keys.clone().unwrap_or(defaults.required_keys),
        strict: raw.strict.unwrap_or(defaults.strict),
        inventory: InventoryConfig {
            url: raw.inventory.url.trim_end_matches('/').to_owned(),
            key_file: raw.inventory.key_file.as_ref().map(|k| config_dir.join(k)),
            login: raw.inventory.login.clone(),
        },
    }
}

/// The two directives shipped before instances became configurable.
fn legacy_directives(base: &Path) -> Vec<DirectiveSettings> {
    vec![
        DirectiveSettings {
            section: "server".to_owned(),
            ..DirectiveSettings::with_defaults("chefserver", base)
        },
        DirectiveSettings::with_defaults("zenserver", base),
    ]
}
