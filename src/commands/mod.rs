//! CLI subcommand implementations

pub mod open;
pub mod status;
