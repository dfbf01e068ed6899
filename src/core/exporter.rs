use crate::domain::model::{Record, RegionSummary};
use crate::utils::error::{EtlError, Result};
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook};
use serde::{Deserialize, Serialize};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(EtlError::InvalidConfigValueError {
                field: "output.format".to_string(),
                value: other.to_string(),
                reason: "Valid formats: xlsx, csv".to_string(),
            }),
        }
    }
}

/// 將紀錄子集序列化為可下載的表格檔
#[derive(Debug, Clone)]
pub struct Exporter {
    format: ExportFormat,
    sheet_name: String,
    /// Pinned into the workbook metadata so identical input gives identical bytes.
    created: NaiveDate,
}

impl Exporter {
    pub fn new(format: ExportFormat, sheet_name: impl Into<String>, created: NaiveDate) -> Self {
        Self {
            format,
            sheet_name: sheet_name.into(),
            created,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Original columns in header order, one row per record, no index column.
    pub fn export(&self, output: &str, headers: &[String], records: &[Record]) -> Result<Vec<u8>> {
        let bytes = match self.format {
            ExportFormat::Xlsx => self.to_xlsx(headers, records),
            ExportFormat::Csv => to_csv(headers, records),
        }
        .map_err(|e| match e {
            EtlError::ExportError { message, .. } => EtlError::export(output, message),
            other => EtlError::export(output, other.to_string()),
        })?;

        tracing::debug!(
            "Exported '{}': {} records, {} bytes",
            output,
            records.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    fn to_xlsx(&self, headers: &[String], records: &[Record]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let created = ExcelDateTime::from_ymd(
            u16::try_from(self.created.year()).unwrap_or(1900),
            self.created.month() as u8,
            self.created.day() as u8,
        )?;
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

        let header_format = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, column(col)?, header, &header_format)?;
        }
        for (i, record) in records.iter().enumerate() {
            let row = u32::try_from(i + 1)
                .map_err(|_| EtlError::export("worksheet", "too many rows for a worksheet"))?;
            for (col, cell) in record.cells.iter().enumerate().take(headers.len()) {
                if !cell.is_empty() {
                    sheet.write_string(row, column(col)?, cell)?;
                }
            }
        }
        sheet.set_freeze_panes(1, 0)?;

        Ok(workbook.save_to_buffer()?)
    }
}

fn column(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| EtlError::export("worksheet", "too many columns for a worksheet"))
}

/// CSV output carries a BOM so spreadsheet tools detect UTF-8.
fn to_csv(headers: &[String], records: &[Record]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(&record.cells)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::export("csv", e.to_string()))
}

/// 彙總表輸出為 CSV：地區、已開工、本月預定
pub fn summary_csv(summary: &RegionSummary) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(["region", "started", "upcoming"])?;
    for row in summary.rows() {
        writer.write_record([
            row.region,
            row.started.to_string(),
            row.upcoming.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::export("summary", e.to_string()))
}

pub fn summary_json(summary: &RegionSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(&summary.rows())?)
}

/// 將多個輸出打包成 ZIP
pub fn bundle(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());

    for (name, data) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BucketCounts;
    use std::collections::BTreeMap;
    use std::io::Read;

    fn headers() -> Vec<String> {
        ["공사명", "시작주소"].iter().map(|s| s.to_string()).collect()
    }

    fn record(cells: &[&str]) -> Record {
        Record {
            row: 1,
            project_name: Some(cells[0].to_string()),
            cable_spec: None,
            start_date: None,
            end_date: None,
            start_address: Some(cells[1].to_string()),
            cells: cells.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn created() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 12).unwrap()
    }

    #[test]
    fn test_csv_export_preserves_columns_without_index() {
        let exporter = Exporter::new(ExportFormat::Csv, "Sheet1", created());
        let records = vec![record(&["굴착, 1구간", "서울 강남"])];

        let bytes = exporter.export("started", &headers(), &records).unwrap();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["공사명,시작주소", "\"굴착, 1구간\",서울 강남"]);
    }

    #[test]
    fn test_xlsx_export_is_deterministic() {
        let exporter = Exporter::new(ExportFormat::Xlsx, "공사목록", created());
        let records = vec![record(&["굴착", "서울 강남"]), record(&["관로", "부산"])];

        let first = exporter.export("started", &headers(), &records).unwrap();
        let second = exporter.export("started", &headers(), &records).unwrap();

        assert!(first.starts_with(b"PK"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_xlsx_export_rejects_bad_sheet_name() {
        let exporter = Exporter::new(ExportFormat::Xlsx, "bad/name", created());

        let err = exporter.export("upcoming", &headers(), &[]).unwrap_err();

        match err {
            EtlError::ExportError { output, .. } => assert_eq!(output, "upcoming"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_summary_csv_lists_total_last() {
        let mut regions = BTreeMap::new();
        regions.insert("서울".to_string(), BucketCounts { started: 1, upcoming: 0 });
        regions.insert("부산".to_string(), BucketCounts { started: 1, upcoming: 0 });
        let summary = RegionSummary {
            regions,
            total_label: "TOTAL".to_string(),
            skipped_rows: vec![],
        };

        let bytes = summary_csv(&summary).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["region,started,upcoming", "부산,1,0", "서울,1,0", "TOTAL,2,0"]);
        assert!(summary_json(&summary).unwrap().contains("\"TOTAL\""));
    }

    #[test]
    fn test_bundle_contains_entries() {
        let data = bundle(&[("a.csv", b"x".as_slice()), ("b.csv", b"yz".as_slice())]).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("b.csv").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "yz");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(
            ExportFormat::Xlsx.mime_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }
}
