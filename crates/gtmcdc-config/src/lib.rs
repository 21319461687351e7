pub mod error;
pub mod filter;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use filter::{
    config_file_path, dev_mode_from_env, load_file, FilterConfig, RawConfig, CONFIG_FILE_ENV,
    DEFAULT_CONFIG_FILE, DEV_MODE_ENV, OFF,
};
pub use validation::validate;
