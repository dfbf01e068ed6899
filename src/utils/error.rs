use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Missing required columns: {}", missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("Malformed address at row {row}: start address is empty")]
    MalformedAddressError { row: usize },

    #[error("Region '{region}' at row {row} collides with the total row label")]
    RegionLabelError { region: String, row: usize },

    #[error("Export of '{output}' failed: {message}")]
    ExportError { output: String, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet reading error: {0}")]
    SpreadsheetError(#[from] calamine::XlsxError),

    #[error("XLSX writing error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// 發生錯誤的管道階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Config,
    Load,
    Aggregate,
    Export,
    Storage,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Config => "config",
            PipelineStage::Load => "load",
            PipelineStage::Aggregate => "aggregate",
            PipelineStage::Export => "export",
            PipelineStage::Storage => "storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Output,
    System,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn export(output: impl Into<String>, message: impl Into<String>) -> Self {
        EtlError::ExportError {
            output: output.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            EtlError::SchemaError { .. }
            | EtlError::CsvError(_)
            | EtlError::SpreadsheetError(_) => PipelineStage::Load,
            EtlError::MalformedAddressError { .. } | EtlError::RegionLabelError { .. } => {
                PipelineStage::Aggregate
            }
            EtlError::ExportError { .. }
            | EtlError::XlsxError(_)
            | EtlError::ZipError(_)
            | EtlError::SerializationError(_) => PipelineStage::Export,
            EtlError::IoError(_) => PipelineStage::Storage,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => PipelineStage::Config,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::SchemaError { .. }
            | EtlError::CsvError(_)
            | EtlError::SpreadsheetError(_) => ErrorCategory::Input,
            EtlError::MalformedAddressError { .. } | EtlError::RegionLabelError { .. } => {
                ErrorCategory::Data
            }
            EtlError::ExportError { .. }
            | EtlError::XlsxError(_)
            | EtlError::ZipError(_)
            | EtlError::SerializationError(_) => ErrorCategory::Output,
            EtlError::IoError(_) => ErrorCategory::System,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Output | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給使用者看的訊息，標示失敗的階段
    pub fn user_friendly_message(&self) -> String {
        let detail = match self {
            EtlError::SchemaError { missing } => format!(
                "The uploaded table is missing required columns: {}",
                missing.join(", ")
            ),
            EtlError::MalformedAddressError { row } => {
                format!("Row {} has no start address, so no region can be derived", row)
            }
            EtlError::RegionLabelError { region, row } => format!(
                "Row {} falls in region '{}', which is also the total row label",
                row, region
            ),
            EtlError::ExportError { output, .. } => {
                format!("Could not produce the '{}' download", output)
            }
            EtlError::CsvError(e) => format!("The uploaded table could not be read: {}", e),
            EtlError::SpreadsheetError(e) => {
                format!("The uploaded workbook could not be read: {}", e)
            }
            EtlError::XlsxError(e) => format!("Spreadsheet output could not be written: {}", e),
            EtlError::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        };
        format!("[{} stage] {}", self.stage(), detail)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::SchemaError { .. } => {
                "Check the header row or adjust the [columns] mapping in the config file"
            }
            EtlError::MalformedAddressError { .. } => {
                "Fill in the start address or set aggregate.address_policy = \"skip\""
            }
            EtlError::RegionLabelError { .. } => {
                "Set aggregate.total_label to a label that no address starts with"
            }
            EtlError::CsvError(_) => "Save the sheet as UTF-8 CSV and upload it again",
            EtlError::SpreadsheetError(_) => {
                "Check input.sheet or save the workbook as UTF-8 CSV and upload it again"
            }
            EtlError::ExportError { .. } | EtlError::XlsxError(_) | EtlError::ZipError(_) => {
                "Try another output format with --format csv"
            }
            EtlError::SerializationError(_) => "Report this input file to the maintainers",
            EtlError::IoError(_) => "Check that the paths exist and are writable",
            _ => "Review the configuration file and command line options",
        }
    }
}
