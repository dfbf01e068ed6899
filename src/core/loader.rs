use crate::domain::model::{Dataset, RawTable, Record};
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use std::sync::LazyLock;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
/// xlsx 是 zip 容器
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// 1900 date system epoch; serial 1 is 1900-01-01 once Excel's leap-year bug is folded in.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// 1927-05-18; smaller bare numbers are more likely years or counts than dates.
const EXCEL_SERIAL_MIN: f64 = 10_000.0;
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

static SEPARATED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})\s*[-/.년]\s*(\d{1,2})\s*[-/.월]\s*(\d{1,2})\s*[.일]?(?:[\sT].*)?$")
        .expect("separated date pattern is valid")
});
static COMPACT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("compact date pattern is valid")
});
static EXCEL_SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{5,7}(?:\.\d+)?$").expect("serial date pattern is valid")
});

/// Source column names for each record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub project_name: String,
    pub cable_spec: String,
    pub start_date: String,
    pub end_date: String,
    pub start_address: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            project_name: "공사명".to_string(),
            cable_spec: "광케이블 조수현황".to_string(),
            start_date: "공사시작일".to_string(),
            end_date: "공사종료일".to_string(),
            start_address: "시작주소".to_string(),
        }
    }
}

impl ColumnMapping {
    /// (field, column) pairs in record field order.
    pub fn as_pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("project_name", self.project_name.as_str()),
            ("cable_spec", self.cable_spec.as_str()),
            ("start_date", self.start_date.as_str()),
            ("end_date", self.end_date.as_str()),
            ("start_address", self.start_address.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Xlsx when the upload starts with a zip signature, CSV otherwise.
    #[default]
    Auto,
    Csv,
    Xlsx,
}

impl InputFormat {
    pub fn resolve(self, bytes: &[u8]) -> InputFormat {
        match self {
            InputFormat::Auto if bytes.starts_with(ZIP_SIGNATURE) => InputFormat::Xlsx,
            InputFormat::Auto => InputFormat::Csv,
            other => other,
        }
    }
}

impl FromStr for InputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(InputFormat::Auto),
            "csv" => Ok(InputFormat::Csv),
            "xlsx" => Ok(InputFormat::Xlsx),
            other => Err(EtlError::InvalidConfigValueError {
                field: "input.format".to_string(),
                value: other.to_string(),
                reason: "expected auto, csv or xlsx".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub format: InputFormat,
    /// Worksheet to read from an xlsx upload; the first sheet when unset.
    pub sheet: Option<String>,
}

/// 依設定的格式讀取上傳內容
pub fn read_table(bytes: &[u8], input: &InputConfig) -> Result<RawTable> {
    match input.format.resolve(bytes) {
        InputFormat::Xlsx => read_xlsx(bytes, input.sheet.as_deref()),
        _ => read_csv(bytes),
    }
}

/// 以 CSV 讀取上傳的表格
pub fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    tracing::debug!("Read {} rows with {} columns", rows.len(), headers.len());
    Ok(RawTable { headers, rows })
}

/// 讀取 xlsx 工作表，第一個非空列為表頭
pub fn read_xlsx(bytes: &[u8], sheet: Option<&str>) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => match workbook.sheet_names().first() {
            Some(first) => first.clone(),
            None => {
                tracing::warn!("⚠️ Workbook has no worksheets");
                return Ok(RawTable::default());
            }
        },
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range
        .rows()
        .filter(|row| !row.iter().all(DataType::is_empty))
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());

    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|h| h.trim().to_string()).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();

    tracing::debug!(
        "Read sheet '{}': {} rows with {} columns",
        sheet_name,
        rows.len(),
        headers.len()
    );
    Ok(RawTable { headers, rows })
}

/// 儲存格轉為文字；日期格式的儲存格輸出 ISO 日期
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => dt.date().format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

/// 寬鬆的日期解析，無法解析時回傳 None
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let caps = SEPARATED_DATE
        .captures(s)
        .or_else(|| COMPACT_DATE.captures(s));
    if let Some(caps) = caps {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if EXCEL_SERIAL.is_match(s) {
        return parse_excel_serial(s);
    }

    None
}

fn parse_excel_serial(s: &str) -> Option<NaiveDate> {
    let serial: f64 = s.parse().ok()?;
    if !(EXCEL_SERIAL_MIN..=EXCEL_SERIAL_MAX).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn non_empty(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 將原始表格轉為紀錄；缺少必要欄位時整批失敗
pub fn load_records(table: &RawTable, columns: &ColumnMapping) -> Result<Dataset> {
    let position = |name: &str| table.headers.iter().position(|h| h == name);

    let missing: Vec<String> = columns
        .as_pairs()
        .iter()
        .filter(|(_, name)| position(*name).is_none())
        .map(|(_, name)| name.to_string())
        .collect();
    if !missing.is_empty() {
        tracing::error!("Schema check failed, missing columns: {:?}", missing);
        return Err(EtlError::SchemaError { missing });
    }

    let index = |name: &str| position(name).unwrap_or_default();
    let project_idx = index(&columns.project_name);
    let cable_idx = index(&columns.cable_spec);
    let start_idx = index(&columns.start_date);
    let end_idx = index(&columns.end_date);
    let address_idx = index(&columns.start_address);

    let mut unparsed_dates = 0;
    let mut records = Vec::with_capacity(table.rows.len());

    for (i, cells) in table.rows.iter().enumerate() {
        let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or_default();

        let mut date = |idx: usize| {
            let raw = cell(idx);
            let parsed = parse_date(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                tracing::debug!("Row {}: unparsable date '{}'", i + 1, raw);
                unparsed_dates += 1;
            }
            parsed
        };
        let start_date = date(start_idx);
        let end_date = date(end_idx);

        records.push(Record {
            row: i + 1,
            project_name: non_empty(cell(project_idx)),
            cable_spec: non_empty(cell(cable_idx)),
            start_date,
            end_date,
            start_address: non_empty(cell(address_idx)),
            cells: cells.clone(),
        });
    }

    if unparsed_dates > 0 {
        tracing::warn!(
            "⚠️ {} date cells could not be parsed and were left empty",
            unparsed_dates
        );
    }
    tracing::info!("Loaded {} records", records.len());

    Ok(Dataset {
        headers: table.headers.clone(),
        records,
        unparsed_dates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_date_accepts_common_layouts() {
        assert_eq!(parse_date("2024-05-01"), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024/5/1"), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024.05.01"), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024. 5. 1."), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024년 5월 1일"), ymd(2024, 5, 1));
        assert_eq!(parse_date("20240501"), ymd(2024, 5, 1));
        assert_eq!(parse_date(" 2024-05-01 13:45:00 "), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024-05-01T09:00:00"), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024-05-01T23:30:00+09:00"), ymd(2024, 5, 1));
    }

    #[test]
    fn test_parse_date_excel_serial() {
        assert_eq!(parse_date("45413"), ymd(2024, 5, 1));
        assert_eq!(parse_date("45413.75"), ymd(2024, 5, 1));
        assert_eq!(parse_date("0"), None);
    }

    #[test]
    fn test_bare_year_is_not_a_serial() {
        assert_eq!(parse_date("2024"), None);
        assert_eq!(parse_date("9999"), None);
        assert_eq!(parse_date("144"), None);
        assert_eq!(parse_date("10000"), ymd(1927, 5, 18));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("미정"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("05/01/2024"), None);
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    const HEADERS: &[&str] = &["번호", "공사명", "광케이블 조수현황", "공사시작일", "공사종료일", "시작주소"];

    #[test]
    fn test_load_records_maps_columns() {
        let raw = table(
            HEADERS,
            &[&["1", "굴착 공사", "144C", "2024-05-01", "미정", "서울 강남"]],
        );

        let dataset = load_records(&raw, &ColumnMapping::default()).unwrap();

        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.unparsed_dates, 1);
        let record = &dataset.records[0];
        assert_eq!(record.row, 1);
        assert_eq!(record.project_name.as_deref(), Some("굴착 공사"));
        assert_eq!(record.cable_spec.as_deref(), Some("144C"));
        assert_eq!(record.start_date, ymd(2024, 5, 1));
        assert_eq!(record.end_date, None);
        assert_eq!(record.start_address.as_deref(), Some("서울 강남"));
        assert_eq!(record.cells[0], "1");
    }

    #[test]
    fn test_blank_cells_load_as_none() {
        let raw = table(HEADERS, &[&["2", "  ", "", "", "", " "]]);

        let dataset = load_records(&raw, &ColumnMapping::default()).unwrap();

        let record = &dataset.records[0];
        assert_eq!(record.project_name, None);
        assert_eq!(record.cable_spec, None);
        assert_eq!(record.start_address, None);
        assert_eq!(dataset.unparsed_dates, 0);
    }

    #[test]
    fn test_missing_columns_are_reported_together() {
        let raw = table(&["공사명", "공사시작일"], &[]);

        let err = load_records(&raw, &ColumnMapping::default()).unwrap_err();

        match err {
            EtlError::SchemaError { missing } => assert_eq!(
                missing,
                vec!["광케이블 조수현황", "공사종료일", "시작주소"]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_csv_strips_bom_and_trims_headers() {
        let bytes = "\u{feff}공사명 , 시작주소\n굴착,서울 강남\n".as_bytes();

        let raw = read_csv(bytes).unwrap();

        assert_eq!(raw.headers, vec!["공사명", "시작주소"]);
        assert_eq!(raw.rows, vec![vec!["굴착".to_string(), "서울 강남".to_string()]]);
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let bytes = b"a,b\n1,2,3\n";
        assert!(matches!(read_csv(bytes), Err(EtlError::CsvError(_))));
    }

    fn workbook(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        for (name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    let (r, c) = (r as u32, c as u16);
                    if let Some(date) = value.strip_prefix("date:") {
                        let date = ExcelDateTime::parse_from_str(date).unwrap();
                        worksheet.write_datetime_with_format(r, c, &date, &date_format).unwrap();
                    } else if let Ok(n) = value.parse::<f64>() {
                        worksheet.write_number(r, c, n).unwrap();
                    } else if !value.is_empty() {
                        worksheet.write_string(r, c, *value).unwrap();
                    }
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_xlsx_selects_configured_sheet() {
        let guide: &[&[&str]] = &[&["이 시트는 설명입니다"]];
        let permits: &[&[&str]] = &[
            HEADERS,
            &["1", "굴착 공사", "144C", "date:2024-05-01", "45432", "서울 강남"],
            &["", "", "", "", "", ""],
            &["2", "관로 매설", "288C", "2024.05.20", "", "부산 해운대"],
        ];
        let bytes = workbook(&[("안내", guide), ("공사목록", permits)]);
        let input = InputConfig {
            format: InputFormat::Auto,
            sheet: Some("공사목록".to_string()),
        };

        let raw = read_table(&bytes, &input).unwrap();
        assert_eq!(raw.headers, HEADERS);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0][0], "1");
        assert_eq!(raw.rows[1][5], "부산 해운대");

        let dataset = load_records(&raw, &ColumnMapping::default()).unwrap();
        assert_eq!(dataset.records[0].start_date, ymd(2024, 5, 1));
        assert_eq!(dataset.records[0].end_date, ymd(2024, 5, 20));
        assert_eq!(dataset.records[1].start_date, ymd(2024, 5, 20));
        assert_eq!(dataset.records[1].end_date, None);
        assert_eq!(dataset.unparsed_dates, 0);
    }

    #[test]
    fn test_read_xlsx_defaults_to_first_sheet() {
        let first: &[&[&str]] = &[&["공사명", "시작주소"], &["굴착", "서울 강남"]];
        let second: &[&[&str]] = &[&["other"]];
        let bytes = workbook(&[("Sheet1", first), ("Sheet2", second)]);

        let raw = read_table(&bytes, &InputConfig::default()).unwrap();

        assert_eq!(raw.headers, vec!["공사명", "시작주소"]);
        assert_eq!(raw.rows, vec![vec!["굴착".to_string(), "서울 강남".to_string()]]);
    }

    #[test]
    fn test_read_xlsx_unknown_sheet_fails() {
        let only: &[&[&str]] = &[&["공사명"]];
        let bytes = workbook(&[("Sheet1", only)]);
        let input = InputConfig {
            format: InputFormat::Xlsx,
            sheet: Some("없는시트".to_string()),
        };

        assert!(matches!(
            read_table(&bytes, &input),
            Err(EtlError::SpreadsheetError(_))
        ));
    }

    #[test]
    fn test_input_format_resolution() {
        assert_eq!(InputFormat::Auto.resolve(b"PK\x03\x04rest"), InputFormat::Xlsx);
        assert_eq!(InputFormat::Auto.resolve("공사명\n".as_bytes()), InputFormat::Csv);
        assert_eq!(InputFormat::Csv.resolve(b"PK\x03\x04"), InputFormat::Csv);
        assert_eq!("XLSX".parse::<InputFormat>().unwrap(), InputFormat::Xlsx);
        assert!("ods".parse::<InputFormat>().is_err());
    }
}
