pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, load_config, load_config_from_str, validate_config, API_URL_ENV,
};
pub use schema::{ClientConfig, DEFAULT_API_URL};
