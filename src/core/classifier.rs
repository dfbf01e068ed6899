use crate::config::toml_config::FilterConfig;
use crate::domain::model::{FilteredResult, Record};
use chrono::{Datelike, NaiveDate};

/// OR-combined, case-sensitive substring patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    patterns: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.into();
            if unique.contains(&pattern) {
                tracing::debug!("Ignoring repeated keyword '{}'", pattern);
                continue;
            }
            unique.push(pattern);
        }
        Self { patterns: unique }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when `text` contains any pattern. An empty set matches nothing.
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }
}

/// Keyword lists used by the relevance predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRules {
    pub exclude: KeywordSet,
    pub include: KeywordSet,
    /// Applied to the project name only when non-empty.
    pub name_include: KeywordSet,
}

impl From<&FilterConfig> for FilterRules {
    fn from(config: &FilterConfig) -> Self {
        Self {
            exclude: KeywordSet::new(config.exclude.iter().cloned()),
            include: KeywordSet::new(config.include.iter().cloned()),
            name_include: KeywordSet::new(config.name_include.iter().cloned()),
        }
    }
}

/// Last calendar day of `date`'s month.
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Started,
    Upcoming,
}

/// 判斷一筆紀錄是否在本月報告範圍內
pub fn is_relevant(record: &Record, today: NaiveDate, rules: &FilterRules) -> bool {
    let (Some(name), Some(cable)) = (&record.project_name, &record.cable_spec) else {
        return false;
    };
    if rules.exclude.matches(name) {
        return false;
    }
    if !rules.include.matches(cable) {
        return false;
    }
    if !rules.name_include.is_empty() && !rules.name_include.matches(name) {
        return false;
    }
    match record.end_date {
        Some(end) => today <= end && end <= end_of_month(today),
        None => false,
    }
}

/// Bucket for an already relevant record. A missing start date, or one past
/// the end of the month, lands in no bucket.
pub fn bucket_for(record: &Record, today: NaiveDate) -> Option<Bucket> {
    let start = record.start_date?;
    if start <= today {
        Some(Bucket::Started)
    } else if start <= end_of_month(today) {
        Some(Bucket::Upcoming)
    } else {
        None
    }
}

/// 套用相關性條件並依開工日分成兩組
pub fn classify(records: &[Record], today: NaiveDate, rules: &FilterRules) -> FilteredResult {
    let mut result = FilteredResult::default();
    let mut relevant = 0;
    let mut unbucketed = 0;

    for record in records.iter().filter(|r| is_relevant(r, today, rules)) {
        relevant += 1;
        match bucket_for(record, today) {
            Some(Bucket::Started) => result.started.push(record.clone()),
            Some(Bucket::Upcoming) => result.upcoming.push(record.clone()),
            None => unbucketed += 1,
        }
    }

    tracing::debug!(
        "Classified {} of {} records as relevant (started: {}, upcoming: {}, outside window: {})",
        relevant,
        records.len(),
        result.started.len(),
        result.upcoming.len(),
        unbucketed
    );
    result
}
