//! CLI command modules.

pub mod init;
pub mod list;
pub mod run;
