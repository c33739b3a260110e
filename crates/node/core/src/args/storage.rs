//! Storage CLI arguments.

use std::path::PathBuf;

use clap::Args;
use hyrule_primitives::CapacityBudget;

#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Storage")]
pub struct StorageArgs {
    /// Directory holding the object database.
    #[arg(long, value_name = "PATH")]
    pub storage_path: Option<PathBuf>,

    /// Capacity budget, e.g. `10GiB`, `512MiB` or `1000objects`.
    #[arg(long, value_name = "BUDGET")]
    pub capacity: Option<CapacityBudget>,

    /// Keep objects in memory only (nothing survives a restart).
    #[arg(long = "storage.memory")]
    pub memory: bool,
}
