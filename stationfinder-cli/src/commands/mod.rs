//! CLI subcommands.

pub mod common;
pub mod init;
pub mod navigate;
pub mod nearby;
