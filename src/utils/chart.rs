use crate::domain::model::RegionSummary;
use std::fmt::Write;

const BAR_WIDTH: usize = 30;

fn bar(count: usize, max: usize, fill: char) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max);
    std::iter::repeat_n(fill, len).collect()
}

/// 文字長條圖：每個地區兩條（已開工／本月預定），條尾標示件數。不含合計列。
pub fn render_bar_chart(summary: &RegionSummary) -> String {
    let max = summary
        .regions
        .values()
        .flat_map(|c| [c.started, c.upcoming])
        .max()
        .unwrap_or(0);
    let label_width = summary
        .regions
        .keys()
        .map(|r| r.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (region, counts) in &summary.regions {
        let pad = label_width - region.chars().count();
        let _ = writeln!(
            out,
            "{}{} started  |{} {}",
            region,
            " ".repeat(pad),
            bar(counts.started, max, '█'),
            counts.started
        );
        let _ = writeln!(
            out,
            "{} upcoming |{} {}",
            " ".repeat(label_width),
            bar(counts.upcoming, max, '░'),
            counts.upcoming
        );
    }
    out
}
