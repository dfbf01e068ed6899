use crate::config::toml_config::TomlConfig;
use crate::config::RunConfig;
use crate::core::exporter::ExportFormat;
use crate::core::loader::InputFormat;
use crate::utils::error::Result;
use chrono::NaiveDate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "permit-watch")]
#[command(about = "Monthly report of construction permits near fiber-optic cable routes")]
pub struct CliConfig {
    /// Uploaded permit table (UTF-8 CSV or xlsx workbook)
    #[arg(short, long)]
    pub input: String,

    /// Override input.format (auto | csv | xlsx)
    #[arg(long, value_parser = parse_input_format)]
    pub input_format: Option<InputFormat>,

    /// Override input.sheet, the worksheet read from an xlsx upload
    #[arg(long)]
    pub sheet: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Reference date (YYYY-MM-DD), defaults to the local date
    #[arg(long, value_parser = parse_today)]
    pub today: Option<NaiveDate>,

    /// Override output.output_path
    #[arg(short, long)]
    pub output_path: Option<String>,

    /// Override output.format (xlsx | csv)
    #[arg(long, value_parser = parse_format)]
    pub format: Option<ExportFormat>,

    /// Also write a zip bundle of every output
    #[arg(long)]
    pub bundle: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Show the effective configuration without processing
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_today(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn parse_input_format(s: &str) -> std::result::Result<InputFormat, String> {
    s.parse::<InputFormat>().map_err(|e| e.to_string())
}

fn parse_format(s: &str) -> std::result::Result<ExportFormat, String> {
    s.parse::<ExportFormat>().map_err(|e| e.to_string())
}

impl CliConfig {
    /// 載入設定檔並套用命令列覆蓋
    pub fn load_settings(&self) -> Result<TomlConfig> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(format) = self.input_format {
            settings.input.format = format;
        }
        if let Some(sheet) = &self.sheet {
            settings.input.sheet = Some(sheet.clone());
        }
        if let Some(output_path) = &self.output_path {
            settings.output.output_path = output_path.clone();
        }
        if let Some(format) = self.format {
            settings.output.format = format;
        }
        if self.bundle {
            settings.output.bundle = true;
        }
        Ok(settings)
    }

    pub fn into_run_config(self, fallback_today: NaiveDate) -> Result<RunConfig> {
        let settings = self.load_settings()?;
        Ok(RunConfig {
            input_path: self.input,
            output_path: settings.output.output_path.clone(),
            today: self.today.unwrap_or(fallback_today),
            settings,
        })
    }
}
