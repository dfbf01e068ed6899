pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::storage::{LocalStorage, MemoryStorage};
pub use config::{toml_config::TomlConfig, RunConfig};
pub use self::core::{
    cache::LoadCache,
    etl::EtlEngine,
    pipeline::PermitPipeline,
    report::{build_report, PermitReport},
};
pub use utils::error::{EtlError, Result};
