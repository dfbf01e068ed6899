use crate::domain::model::{BucketCounts, Record, RegionSummary};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do with a record whose start address is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPolicy {
    /// Leave the record out of every region row and remember its row number.
    #[default]
    Skip,
    /// Fail the run with `MalformedAddressError`.
    Reject,
}

/// 地區鍵：起點地址的第一個以空白分隔的詞
pub fn region_key(record: &Record) -> Result<&str> {
    record
        .start_address
        .as_deref()
        .and_then(|addr| addr.split_whitespace().next())
        .ok_or_else(|| EtlError::MalformedAddressError { row: record.row })
}

fn count_by_region<'a>(
    records: &'a [Record],
    policy: AddressPolicy,
    total_label: &str,
    skipped: &mut Vec<usize>,
) -> Result<BTreeMap<&'a str, usize>> {
    let mut counts = BTreeMap::new();
    for record in records {
        match region_key(record) {
            // 合計列必須與地區列可區分
            Ok(region) if region == total_label => {
                return Err(EtlError::RegionLabelError {
                    region: region.to_string(),
                    row: record.row,
                });
            }
            Ok(region) => *counts.entry(region).or_insert(0) += 1,
            Err(e) => match policy {
                AddressPolicy::Reject => return Err(e),
                AddressPolicy::Skip => {
                    tracing::warn!("⚠️ Row {} has no start address, skipped", record.row);
                    skipped.push(record.row);
                }
            },
        }
    }
    Ok(counts)
}

/// 兩組各自計數後以地區鍵外部合併，缺的一側補 0
pub fn summarize(
    started: &[Record],
    upcoming: &[Record],
    policy: AddressPolicy,
    total_label: &str,
) -> Result<RegionSummary> {
    let mut skipped_rows = Vec::new();
    let started_counts = count_by_region(started, policy, total_label, &mut skipped_rows)?;
    let upcoming_counts = count_by_region(upcoming, policy, total_label, &mut skipped_rows)?;

    let mut regions: BTreeMap<String, BucketCounts> = BTreeMap::new();
    for (region, n) in started_counts {
        regions.entry(region.to_string()).or_default().started = n;
    }
    for (region, n) in upcoming_counts {
        regions.entry(region.to_string()).or_default().upcoming = n;
    }
    skipped_rows.sort_unstable();

    tracing::debug!(
        "Summarized {} regions ({} rows skipped)",
        regions.len(),
        skipped_rows.len()
    );

    Ok(RegionSummary {
        regions,
        total_label: total_label.to_string(),
        skipped_rows,
    })
}
