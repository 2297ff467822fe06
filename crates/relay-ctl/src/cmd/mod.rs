//! CLI command modules.

pub mod events;
pub mod http;
pub mod status;
pub mod tasks;
