//! Subcommand implementations.

pub(crate) mod init;
pub(crate) mod query;
pub(crate) mod start;
