#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use chrono::NaiveDate;
use toml_config::TomlConfig;

/// Effective settings for one run: file settings plus per-run inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_path: String,
    pub output_path: String,
    pub today: NaiveDate,
    pub settings: TomlConfig,
}

impl ConfigProvider for RunConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn today(&self) -> NaiveDate {
        self.today
    }

    fn settings(&self) -> &TomlConfig {
        &self.settings
    }
}
