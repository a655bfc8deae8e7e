use crate::error::{PipelineError, PipelineResult};
use crate::loader::LoadReport;
use crate::types::SummaryStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Contents of `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryFile<'a> {
    pub generated_at: DateTime<Utc>,
    pub stats: &'a SummaryStats,
    pub load: &'a LoadReport,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Io { path: path.to_path_buf(), source }
}

/// Write rows as CSV with a header line. `None` cells come out empty.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(io_error(path))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(io_error(path))?;
    Ok(())
}

/// Markdown preview of the first `max_rows` rows, noting how many were left
/// out.
pub fn render_preview<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let shown = rows.len().min(max_rows);
    let mut rendered = Table::new(rows[..shown].to_vec())
        .with(Style::markdown())
        .to_string();
    if shown < rows.len() {
        rendered.push_str(&format!("\n... {} more rows", rows.len() - shown));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SettlementSummaryRow;

    #[test]
    fn unavailable_values_are_empty_csv_cells() {
        let dir = std::env::temp_dir().join(format!("hdr_output_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settlement.csv");
        let rows = vec![SettlementSummaryRow {
            group: "Rural".to_string(),
            households: 1,
            avg_debt: Some(10.0),
            avg_income: Some(0.0),
            debt_income_ratio: None,
        }];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Group,Households,AvgDebt,AvgIncome,DebtIncomeRatio"));
        assert_eq!(lines.next(), Some("Rural,1,10.0,0.0,"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn preview_is_markdown_and_counts_hidden_rows() {
        let row = |group: &str| SettlementSummaryRow {
            group: group.to_string(),
            households: 1,
            avg_debt: None,
            avg_income: Some(1234.5),
            debt_income_ratio: None,
        };
        let rows = vec![row("Urban"), row("Rural")];

        let preview = render_preview(&rows, 1);
        assert!(preview.starts_with("| Group"));
        assert!(preview.contains("| Urban"));
        assert!(!preview.contains("Rural"));
        assert!(preview.contains("n/a"));
        assert!(preview.contains("1,234.50"));
        assert!(preview.ends_with("... 1 more rows"));

        assert!(!render_preview(&rows, 5).contains("more rows"));
        assert_eq!(render_preview::<SettlementSummaryRow>(&[], 5), "(no rows)");
    }

    #[test]
    fn summary_json_nulls_unavailable_stats() {
        let stats = SummaryStats {
            households: 0,
            total_weight: 0.0,
            avg_debt: None,
            avg_income: None,
            avg_asset: None,
            debt_income_ratio: None,
            indebted_share: None,
            avg_houses_owned: None,
        };
        let load = LoadReport::default();
        let file = SummaryFile { generated_at: Utc::now(), stats: &stats, load: &load };
        let value = serde_json::to_value(&file).unwrap();
        assert!(value["stats"]["avg_debt"].is_null());
        assert_eq!(value["load"]["households"], 0);
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn writing_into_missing_directory_fails_with_path() {
        let path = Path::new("/nonexistent/dir/summary.json");
        let err = write_json(path, &1).unwrap_err();
        assert!(err.to_string().contains("summary.json"));
    }
}
