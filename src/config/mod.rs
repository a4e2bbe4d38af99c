// Configuration management module
// TOML settings, validation, and the on-disk layout derived from the base directory

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DuplicateCheck, IngestionConfig, OllamaConfig, RetrievalConfig,
};

/// Get the base directory holding configuration, the index, and staged uploads
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_base_dir()
}
