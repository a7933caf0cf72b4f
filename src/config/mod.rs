//! Configuration module for mirrorfleet
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority, applied by the binary)
//! 2. Environment variables (MIRRORFLEET_*)
//! 3. `--config` file, else `./mirrorfleet.toml`, else
//!    `<user config dir>/mirrorfleet/config.toml`
//! 4. Built-in defaults for the `[ssh]` table

mod loader;
mod types;

pub use loader::{
    apply_overrides, default_locations, expand_home, resolve, with_env_overrides, ConfigWarning,
    LoadedConfig, CONFIG_FILE_NAME,
};
pub use types::{Config, NodeConfig, SshConfig};
