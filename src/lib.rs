pub mod cli;
pub mod clipboard;
pub mod config;
pub mod controller;
pub mod errors;
pub mod identity;
pub mod keys;
pub mod logging;
pub mod store;
