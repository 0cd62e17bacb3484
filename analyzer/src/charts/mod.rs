//! Chart rendering for a cleaned municipality-year.
//!
//! Four charts, drawn with `plotters` on its SVG backend and written as
//! standalone files named by year:
//!
//! - `monthly_evolution_<year>.svg` - line of monthly totals
//! - `total_<year>.svg` - single bar with the annual total
//! - `monthly_composition_<year>.svg` - stacked bars per month and component
//! - `overall_composition_<year>.svg` - donut of component shares

use plotters::element::Pie;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::{ChartError, ChartResult};
use crate::logs::log_success;
use crate::models::CleanedTable;
use crate::output::write_text;
use crate::report::{component_totals, monthly_composition, monthly_totals, title_case};

const STAGE: &str = "charts";

/// Viridis-like palette, cycled per component.
const PALETTE: [RGBColor; 6] = [
    RGBColor(68, 1, 84),
    RGBColor(59, 82, 139),
    RGBColor(33, 145, 140),
    RGBColor(94, 201, 98),
    RGBColor(253, 231, 37),
    RGBColor(242, 142, 43),
];

const LINE: RGBColor = RGBColor(31, 119, 180);

const FONT: &str = "sans-serif";

fn color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// Map a backend error to [`ChartError::Render`] for `chart`.
fn render_err<E: std::fmt::Display>(chart: &str) -> impl Fn(E) -> ChartError + '_ {
    move |e| ChartError::Render {
        chart: chart.to_string(),
        message: e.to_string(),
    }
}

/// Y-axis upper bound with headroom above `max`.
fn y_upper(max: i64) -> f64 {
    (max as f64 * 1.15).max(1.0)
}

fn whole(v: &f64) -> String {
    format!("{:.0}", v)
}

fn blank(_: &f64) -> String {
    String::new()
}

/// Line chart of monthly totals over ticks 1-12.
pub fn monthly_evolution_svg(table: &CleanedTable, title_text: &str) -> ChartResult<String> {
    let err = render_err("monthly evolution");
    let monthly = monthly_totals(table);
    let max = monthly.iter().map(|m| m.total).max().unwrap_or(0);
    let points: Vec<(u32, f64)> = monthly.iter().map(|m| (m.month, m.total as f64)).collect();

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (960, 540)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title_text, (FONT, 22))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(1u32..12u32, 0f64..y_upper(max))
            .map_err(&err)?;
        chart
            .configure_mesh()
            .x_labels(12)
            .x_desc("Mês")
            .y_desc("Total de Ocorrências")
            .y_label_formatter(&whole)
            .draw()
            .map_err(&err)?;

        chart
            .draw_series(LineSeries::new(points.clone(), LINE.stroke_width(2)))
            .map_err(&err)?;
        chart
            .draw_series(points.iter().map(|p| Circle::new(*p, 5, LINE.filled())))
            .map_err(&err)?;
        root.present().map_err(&err)?;
    }
    Ok(buf)
}

/// Single bar with the grand total.
pub fn total_bar_svg(table: &CleanedTable, year: i32, title_text: &str) -> ChartResult<String> {
    let err = render_err("annual total");
    let total = table.grand_total().ok_or(ChartError::TotalOverflow)?;

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (640, 420)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title_text, (FONT, 18))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..2f64, 0f64..y_upper(total))
            .map_err(&err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&blank)
            .x_desc(year.to_string())
            .y_desc("Total de Ocorrências")
            .y_label_formatter(&whole)
            .draw()
            .map_err(&err)?;

        let value = total as f64;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.6, 0.0), (1.4, value)],
                color(1).filled(),
            )))
            .map_err(&err)?;
        chart
            .draw_series(std::iter::once(Text::new(
                total.to_string(),
                (0.95, value * 1.02 + 0.5),
                (FONT, 16).into_font(),
            )))
            .map_err(&err)?;
        root.present().map_err(&err)?;
    }
    Ok(buf)
}

/// Stacked bars per month, one band per component, with legend.
pub fn monthly_composition_svg(table: &CleanedTable, title_text: &str) -> ChartResult<String> {
    let err = render_err("monthly composition");
    let composition = monthly_composition(table);
    let max = composition
        .values()
        .map(|c| c.iter().fold(0i64, |acc, v| acc.saturating_add(*v)))
        .max()
        .unwrap_or(0);

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (1120, 560)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title_text, (FONT, 20))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((1u32..13u32).into_segmented(), 0f64..y_upper(max))
            .map_err(&err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(12)
            .x_desc("Mês")
            .y_desc("Número de Ocorrências")
            .y_label_formatter(&whole)
            .draw()
            .map_err(&err)?;

        for (c, name) in table.components.iter().enumerate() {
            let fill = color(c);
            let bars: Vec<_> = composition
                .iter()
                .map(|(month, counts)| {
                    let base: i64 = counts[..c].iter().fold(0, |acc, v| acc.saturating_add(*v));
                    let top = base.saturating_add(counts.get(c).copied().unwrap_or(0));
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::Exact(*month), base as f64),
                            (SegmentValue::Exact(*month + 1), top as f64),
                        ],
                        fill.filled(),
                    );
                    bar.set_margin(0, 0, 8, 8);
                    bar
                })
                .collect();
            chart
                .draw_series(bars)
                .map_err(&err)?
                .label(name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], fill.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()
            .map_err(&err)?;
        root.present().map_err(&err)?;
    }
    Ok(buf)
}

/// Donut of component shares starting at 140 degrees. Zero-total
/// components are omitted; labels carry one-decimal percentages.
pub fn overall_composition_svg(table: &CleanedTable, title_text: &str) -> ChartResult<String> {
    let err = render_err("overall composition");
    let slices: Vec<(usize, String, i64)> = component_totals(table)
        .into_iter()
        .enumerate()
        .filter(|(_, (_, total))| *total > 0)
        .map(|(i, (name, total))| (i, name, total))
        .collect();
    let sum: f64 = slices.iter().map(|(_, _, t)| *t as f64).sum();

    let sizes: Vec<f64> = slices.iter().map(|(_, _, t)| *t as f64).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|(c, _, _)| color(*c)).collect();
    let labels: Vec<String> = slices
        .iter()
        .map(|(_, name, t)| format!("{} ({:.1}%)", name, *t as f64 / sum * 100.0))
        .collect();

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (720, 720)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;
        let area = root.titled(title_text, (FONT, 20).into_font()).map_err(&err)?;

        if !sizes.is_empty() {
            let (w, h) = area.dim_in_pixel();
            let center = (w as i32 / 2, h as i32 / 2);
            let radius = f64::from(w.min(h)) * 0.32;

            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
            pie.start_angle(140.0);
            pie.donut_hole(radius * 0.7);
            pie.label_style((FONT, 14).into_font().color(&BLACK));
            area.draw(&pie).map_err(&err)?;
        }
        root.present().map_err(&err)?;
    }
    Ok(buf)
}

/// File paths of the four charts for `year` under `dir`.
pub fn chart_paths(dir: &Path, year: i32) -> [PathBuf; 4] {
    [
        dir.join(format!("monthly_evolution_{}.svg", year)),
        dir.join(format!("total_{}.svg", year)),
        dir.join(format!("monthly_composition_{}.svg", year)),
        dir.join(format!("overall_composition_{}.svg", year)),
    ]
}

/// Render and write all four charts, returning their paths.
pub fn render_all(
    table: &CleanedTable,
    municipality: &str,
    year: i32,
    dir: &Path,
) -> ChartResult<Vec<PathBuf>> {
    if table.is_empty() {
        return Err(ChartError::EmptyDataset);
    }

    let base = format!("Letalidade Violenta - {} ({})", title_case(municipality.trim()), year);
    let documents = [
        monthly_evolution_svg(table, &format!("Evolução Mensal - {}", base))?,
        total_bar_svg(table, year, &format!("Total de {}", base))?,
        monthly_composition_svg(table, &format!("Composição Mensal por Tipo de Crime - {}", base))?,
        overall_composition_svg(table, &format!("Composição Geral por Tipo de Crime - {}", base))?,
    ];

    let mut written = Vec::with_capacity(documents.len());
    for (path, doc) in chart_paths(dir, year).into_iter().zip(documents.iter()) {
        write_text(&path, doc)?;
        log_success(STAGE, format!("Chart saved: {}", path.display()));
        written.push(path);
    }
    Ok(written)
}
