pub mod config;
pub mod controller;

pub use config::{ConfigError, MegaphoneConfig, find_config_file};
pub use controller::Megaphone;
