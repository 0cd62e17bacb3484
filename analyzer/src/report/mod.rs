//! Descriptive statistics over a cleaned municipality-year.
//!
//! Computes the grand total, per-month totals with their max and min
//! months, and each component's share of the total, then renders them as
//! a deterministic text report (or JSON via serde). Partial sums
//! saturate; [`summarize`] rejects tables whose grand total overflows.

use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use crate::error::{ReportError, ReportResult};
use crate::models::{CleanedTable, ComponentSummary, MonthlyTotal};

// =============================================================================
// Aggregations
// =============================================================================

/// Totals per month, ascending by month.
pub fn monthly_totals(table: &CleanedTable) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<u32, i64> = BTreeMap::new();
    for r in &table.records {
        let slot = by_month.entry(r.month).or_default();
        *slot = slot.saturating_add(r.lethality_total);
    }
    by_month
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

/// Per-month component counts, ascending by month; inner vectors are
/// parallel to `table.components`.
pub fn monthly_composition(table: &CleanedTable) -> BTreeMap<u32, Vec<i64>> {
    let width = table.components.len();
    let mut by_month: BTreeMap<u32, Vec<i64>> = BTreeMap::new();
    for r in &table.records {
        let acc = by_month.entry(r.month).or_insert_with(|| vec![0; width]);
        for (slot, count) in acc.iter_mut().zip(&r.counts) {
            *slot = slot.saturating_add(*count);
        }
    }
    by_month
}

/// Total per component, in component order.
pub fn component_totals(table: &CleanedTable) -> Vec<(String, i64)> {
    table
        .components
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let total = table
                .records
                .iter()
                .map(|r| r.counts.get(i).copied().unwrap_or(0))
                .fold(0i64, i64::saturating_add);
            (name.clone(), total)
        })
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Component totals with percentage of `grand_total`, sorted by total
/// descending; equal totals keep component order. A zero grand total
/// yields 0% everywhere.
pub fn component_summaries(table: &CleanedTable, grand_total: i64) -> Vec<ComponentSummary> {
    let mut summaries: Vec<ComponentSummary> = component_totals(table)
        .into_iter()
        .map(|(name, total)| {
            let percentage = if grand_total == 0 {
                0.0
            } else {
                round2(total as f64 / grand_total as f64 * 100.0)
            };
            ComponentSummary { name, total, percentage }
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total));
    summaries
}

/// First month holding the max (`want_max`) or min total.
fn extreme_month(monthly: &[MonthlyTotal], want_max: bool) -> Option<MonthlyTotal> {
    let mut best: Option<MonthlyTotal> = None;
    for m in monthly {
        let better = match best {
            None => true,
            Some(b) if want_max => m.total > b.total,
            Some(b) => m.total < b.total,
        };
        if better {
            best = Some(*m);
        }
    }
    best
}

// =============================================================================
// Summary
// =============================================================================

/// Everything the text report shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub municipality: String,
    pub year: i32,
    pub source: String,
    pub total: i64,
    pub monthly: Vec<MonthlyTotal>,
    pub max_month: MonthlyTotal,
    pub min_month: MonthlyTotal,
    pub components: Vec<ComponentSummary>,
}

/// Summarize a cleaned table. `municipality`, `year` and `source` only
/// label the report.
pub fn summarize(
    table: &CleanedTable,
    municipality: &str,
    year: i32,
    source: &str,
) -> ReportResult<Summary> {
    if table.is_empty() {
        return Err(ReportError::EmptyDataset);
    }

    let total = table.grand_total().ok_or(ReportError::TotalOverflow)?;
    let monthly = monthly_totals(table);
    let max_month = extreme_month(&monthly, true).ok_or(ReportError::EmptyDataset)?;
    let min_month = extreme_month(&monthly, false).ok_or(ReportError::EmptyDataset)?;

    Ok(Summary {
        municipality: municipality.to_string(),
        year,
        source: source.to_string(),
        total,
        monthly,
        max_month,
        min_month,
        components: component_summaries(table, total),
    })
}

// =============================================================================
// Text Rendering
// =============================================================================

#[derive(Tabled)]
struct MonthRow {
    #[tabled(rename = "Mês")]
    month: String,
    #[tabled(rename = "Letalidade Violenta")]
    total: String,
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Tipo de Crime")]
    name: String,
    #[tabled(rename = "Total Ocorrências")]
    total: String,
    #[tabled(rename = "Percentual (%)")]
    percentage: String,
}

/// Title case: first letter of each word upper, rest lower.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Render the report text.
pub fn format_summary(summary: &Summary) -> String {
    let month_rows: Vec<MonthRow> = summary
        .monthly
        .iter()
        .map(|m| MonthRow {
            month: m.month.to_string(),
            total: m.total.to_string(),
        })
        .collect();
    let component_rows: Vec<ComponentRow> = summary
        .components
        .iter()
        .map(|c| ComponentRow {
            name: c.name.clone(),
            total: c.total.to_string(),
            percentage: format!("{:.2}", c.percentage),
        })
        .collect();

    let mut lines = vec![
        format!(
            "--- Análise Exploratória de Dados (EDA) - Letalidade Violenta em {} ({}) ---",
            title_case(summary.municipality.trim()),
            summary.year
        ),
        format!("Fonte dos Dados: ISP-RJ ({})", summary.source),
        "\n---\n".to_string(),
        format!(
            "1. Total de Ocorrências de Letalidade Violenta em {}: {}",
            summary.year, summary.total
        ),
        "\n2. Evolução Mensal da Letalidade Violenta:".to_string(),
        Table::new(month_rows).with(Style::blank()).to_string(),
        format!(
            "   - Mês com maior letalidade: {} ({} ocorrências)",
            summary.max_month.month, summary.max_month.total
        ),
        format!(
            "   - Mês com menor letalidade: {} ({} ocorrências)",
            summary.min_month.month, summary.min_month.total
        ),
        "\n3. Composição da Letalidade Violenta por Tipo de Crime:".to_string(),
        Table::new(component_rows).with(Style::blank()).to_string(),
    ];
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CleanedRecord;
    use chrono::NaiveDate;

    fn record(month: u32, counts: Vec<i64>) -> CleanedRecord {
        CleanedRecord {
            year: 2024,
            month,
            municipality: "Rio de Janeiro".into(),
            lethality_total: counts.iter().sum(),
            counts,
            date: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
        }
    }

    fn table(records: Vec<CleanedRecord>) -> CleanedTable {
        CleanedTable {
            components: vec![
                "hom_doloso".into(),
                "latrocinio".into(),
                "lesao_corp_morte".into(),
                "hom_por_interv_policial".into(),
            ],
            records,
        }
    }

    #[test]
    fn test_max_min_and_total() {
        let t = table(vec![record(1, vec![10, 0, 2, 3]), record(2, vec![3, 1, 0, 1])]);
        let s = summarize(&t, "RIO DE JANEIRO", 2024, "BaseMunicipioMensal.csv").unwrap();
        assert_eq!(s.total, 20);
        assert_eq!(s.max_month, MonthlyTotal { month: 1, total: 15 });
        assert_eq!(s.min_month, MonthlyTotal { month: 2, total: 5 });
    }

    #[test]
    fn test_ties_take_earliest_month() {
        let t = table(vec![
            record(3, vec![5, 0, 0, 0]),
            record(1, vec![2, 0, 0, 0]),
            record(2, vec![5, 0, 0, 0]),
            record(4, vec![2, 0, 0, 0]),
        ]);
        let s = summarize(&t, "Rio", 2024, "x.csv").unwrap();
        assert_eq!(s.max_month.month, 2);
        assert_eq!(s.min_month.month, 1);
        let months: Vec<u32> = s.monthly.iter().map(|m| m.month).collect();
        assert_eq!(months, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_monthly_totals_group_duplicates() {
        let t = table(vec![record(1, vec![1, 1, 0, 0]), record(1, vec![3, 0, 0, 0])]);
        assert_eq!(monthly_totals(&t), vec![MonthlyTotal { month: 1, total: 5 }]);
    }

    #[test]
    fn test_component_percentages() {
        let t = table(vec![record(1, vec![10, 0, 2, 3]), record(2, vec![3, 1, 0, 1])]);
        let s = summarize(&t, "Rio", 2024, "x.csv").unwrap();
        let names: Vec<&str> = s.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["hom_doloso", "hom_por_interv_policial", "lesao_corp_morte", "latrocinio"]);
        assert_eq!(s.components[0].total, 13);
        assert_eq!(s.components[0].percentage, 65.0);
        assert_eq!(s.components[3].percentage, 5.0);
        let sum: f64 = s.components.iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() < 0.05);
    }

    #[test]
    fn test_percentages_round_to_two_decimals() {
        let t = table(vec![record(1, vec![1, 1, 1, 0])]);
        let s = summarize(&t, "Rio", 2024, "x.csv").unwrap();
        assert_eq!(s.components[0].percentage, 33.33);
    }

    #[test]
    fn test_zero_total_gives_zero_percent() {
        let t = table(vec![record(1, vec![0, 0, 0, 0])]);
        let s = summarize(&t, "Rio", 2024, "x.csv").unwrap();
        assert!(s.components.iter().all(|c| c.percentage == 0.0));
    }

    #[test]
    fn test_empty_dataset() {
        let err = summarize(&table(vec![]), "Rio", 2024, "x.csv").unwrap_err();
        assert!(matches!(err, ReportError::EmptyDataset));
    }

    #[test]
    fn test_grand_total_overflow() {
        let t = table(vec![record(1, vec![i64::MAX, 0, 0, 0]), record(2, vec![1, 0, 0, 0])]);
        let err = summarize(&t, "Rio", 2024, "x.csv").unwrap_err();
        assert!(matches!(err, ReportError::TotalOverflow));
    }

    #[test]
    fn test_monthly_composition() {
        let t = table(vec![record(2, vec![1, 2, 3, 4]), record(1, vec![1, 0, 0, 0]), record(2, vec![1, 0, 0, 1])]);
        let comp = monthly_composition(&t);
        assert_eq!(comp.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(comp[&2], vec![2, 2, 3, 5]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("RIO DE JANEIRO"), "Rio De Janeiro");
        assert_eq!(title_case("são joão de meriti"), "São João De Meriti");
    }

    #[test]
    fn test_format_is_deterministic() {
        let t = table(vec![record(1, vec![10, 0, 2, 3]), record(2, vec![3, 1, 0, 1])]);
        let s = summarize(&t, "RIO DE JANEIRO", 2024, "BaseMunicipioMensal.csv").unwrap();
        let text = format_summary(&s);
        assert_eq!(text, format_summary(&s));
        assert!(text.starts_with("--- Análise Exploratória de Dados (EDA) - Letalidade Violenta em Rio De Janeiro (2024) ---"));
        assert!(text.contains("Fonte dos Dados: ISP-RJ (BaseMunicipioMensal.csv)"));
        assert!(text.contains("1. Total de Ocorrências de Letalidade Violenta em 2024: 20"));
        assert!(text.contains("Mês com maior letalidade: 1 (15 ocorrências)"));
        assert!(text.contains("Mês com menor letalidade: 2 (5 ocorrências)"));
        assert!(text.contains("65.00"));
        let component_section = text.split("3. Composição").nth(1).unwrap();
        let first = component_section.find("hom_doloso").unwrap();
        let last = component_section.find("latrocinio").unwrap();
        assert!(first < last);
    }
}
