//! `hyrule-node init`: write a default configuration file.

use eyre::{Result, bail};
use hyrule_node_core::NodeConfig;

use crate::cli::InitCommand;

pub(crate) fn run(command: InitCommand) -> Result<()> {
    if command.output.exists() && !command.force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            command.output.display()
        );
    }
    NodeConfig::default().save(&command.output)?;
    println!("Wrote {}", command.output.display());
    Ok(())
}
