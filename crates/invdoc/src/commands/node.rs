//! `invdoc node` command implementation.

use std::path::PathBuf;

use clap::Args;
use invdoc_config::Config;
use invdoc_inventory::Session;
use invdoc_site::chef_inventory;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the node command.
#[derive(Args)]
pub(crate) struct NodeArgs {
    /// Node name, as used for `fqdn` in directive bodies.
    name: String,

    /// Directive instance whose inventory is queried (default: the first configured).
    #[arg(short, long)]
    directive: Option<String>,

    /// Path to configuration file (default: auto-discover invdoc.toml).
    #[arg(short, long, env = "INVDOC_CONFIG")]
    config: Option<PathBuf>,
}

impl NodeArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let settings = match &self.directive {
            Some(name) => config.directive(name).ok_or_else(|| {
                CliError::Validation(format!("directive '{name}' is not configured"))
            })?,
            None => config
                .directives_resolved
                .first()
                .ok_or_else(|| CliError::Validation("no directives configured".to_owned()))?,
        };

        tracing::debug!(node = %self.name, directive = %settings.name, "Fetching node");
        let inventory = chef_inventory(settings)?;
        let node = {
            let mut session = Session::open(inventory.as_ref())?;
            session.node(&self.name)?
        };

        output.data(&serde_json::to_string_pretty(&node.to_context())?);
        Ok(())
    }
}
