//! Configuration — project settings from `.keydash.toml`.

pub mod settings;

pub use settings::{LogFormat, Settings, StoreBackend};
