//! One module per subcommand; each exposes an `execute` entry point.

pub mod completions;
pub mod copy;
pub mod create;
pub mod dashboard;
pub mod delete;
pub mod edit;
pub mod list;
pub mod view;
