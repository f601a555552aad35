mod config;

pub use config::{CONFIG, Config, load_config};
