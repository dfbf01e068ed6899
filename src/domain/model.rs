use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// 上傳表格的原始內容：有序表頭加上字串列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// 一筆施工許可紀錄
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// 1-based data row number, header excluded.
    pub row: usize,
    pub project_name: Option<String>,
    pub cable_spec: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_address: Option<String>,
    /// Original cells in header order, used for export.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// Date cells that were non-empty but could not be parsed.
    pub unparsed_dates: usize,
}

/// Relevant records split by start date. The two buckets never share a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredResult {
    pub started: Vec<Record>,
    pub upcoming: Vec<Record>,
}

impl FilteredResult {
    pub fn len(&self) -> usize {
        self.started.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub started: usize,
    pub upcoming: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub region: String,
    pub started: usize,
    pub upcoming: usize,
}

/// 地區彙總表。資料列依地區鍵排序，合計列固定在最後。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSummary {
    pub regions: BTreeMap<String, BucketCounts>,
    pub total_label: String,
    /// Rows left out because their start address was empty.
    pub skipped_rows: Vec<usize>,
}

impl RegionSummary {
    pub fn get(&self, region: &str) -> Option<BucketCounts> {
        self.regions.get(region).copied()
    }

    pub fn total(&self) -> BucketCounts {
        self.regions
            .values()
            .fold(BucketCounts::default(), |acc, c| BucketCounts {
                started: acc.started + c.started,
                upcoming: acc.upcoming + c.upcoming,
            })
    }

    /// Data rows in region order followed by the total row.
    pub fn rows(&self) -> Vec<SummaryRow> {
        let mut rows: Vec<SummaryRow> = self
            .regions
            .iter()
            .map(|(region, c)| SummaryRow {
                region: region.clone(),
                started: c.started,
                upcoming: c.upcoming,
            })
            .collect();
        let total = self.total();
        rows.push(SummaryRow {
            region: self.total_label.clone(),
            started: total.started,
            upcoming: total.upcoming,
        });
        rows
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub headers: Vec<String>,
    pub filtered: FilteredResult,
    pub summary: RegionSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// Paths written, relative to the storage root.
    pub files: Vec<String>,
    pub summary: RegionSummary,
}
