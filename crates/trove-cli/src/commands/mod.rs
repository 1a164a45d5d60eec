//! CLI commands

pub mod clean;
pub mod list;
pub mod publish;
pub mod remote;
pub mod sync;
