// Settings: JSON configuration file.

pub mod config;
pub mod types;
