use crate::core::aggregator::AddressPolicy;
use crate::core::exporter::ExportFormat;
use crate::core::loader::{ColumnMapping, InputConfig};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub report: ReportConfig,
    pub input: InputConfig,
    pub columns: ColumnMapping,
    pub filter: FilterConfig,
    pub aggregate: AggregateConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub sheet_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "광케이블 인근 공사 현황".to_string(),
            sheet_name: "Sheet1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 공사명에 포함되면 제외
    pub exclude: Vec<String>,
    /// 광케이블 조수현황에 하나라도 포함되어야 함
    pub include: Vec<String>,
    /// 비어 있지 않으면 공사명에도 하나 이상 포함되어야 함
    pub name_include: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude: vec!["주차장".to_string(), "유지보수".to_string()],
            include: vec!["144C".to_string()],
            name_include: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub address_policy: AddressPolicy,
    pub total_label: String,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            address_policy: AddressPolicy::Skip,
            total_label: "TOTAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_path: String,
    pub format: ExportFormat,
    /// File stems; the extension follows `format`.
    pub started_name: String,
    pub upcoming_name: String,
    pub summary_file: String,
    pub bundle: bool,
    pub bundle_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            format: ExportFormat::Xlsx,
            started_name: "started_this_month".to_string(),
            upcoming_name: "upcoming_this_month".to_string(),
            summary_file: "summary.csv".to_string(),
            bundle: false,
            bundle_file: "permit_report.zip".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn started_file(&self) -> String {
        format!("{}.{}", self.started_name, self.format.extension())
    }

    pub fn upcoming_file(&self) -> String {
        format!("{}.{}", self.upcoming_name, self.format.extension())
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| EtlError::config(format!("env pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_keywords("filter.exclude", &self.filter.exclude, false)?;
        validation::validate_keywords("filter.include", &self.filter.include, true)?;
        validation::validate_keywords("filter.name_include", &self.filter.name_include, false)?;

        let columns = self.columns.as_pairs();
        for (field, name) in &columns {
            validation::validate_non_empty_string(&format!("columns.{}", field), name)?;
        }
        validation::validate_unique("columns", columns.iter().map(|(_, name)| *name))?;

        validation::validate_sheet_name("report.sheet_name", &self.report.sheet_name)?;
        if let Some(sheet) = &self.input.sheet {
            validation::validate_sheet_name("input.sheet", sheet)?;
        }
        validation::validate_non_empty_string(
            "aggregate.total_label",
            &self.aggregate.total_label,
        )?;

        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_file_name("output.started_name", &self.output.started_name)?;
        validation::validate_file_name("output.upcoming_name", &self.output.upcoming_name)?;
        validation::validate_file_name("output.summary_file", &self.output.summary_file)?;
        if self.output.bundle {
            validation::validate_file_name("output.bundle_file", &self.output.bundle_file)?;
        }
        if self.output.started_name == self.output.upcoming_name {
            return Err(EtlError::InvalidConfigValueError {
                field: "output.upcoming_name".to_string(),
                value: self.output.upcoming_name.clone(),
                reason: "must differ from output.started_name".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
