//! SVG report charts.
//!
//! Rendering is a pure function of aggregate rows, so a rendered chart can be
//! cached until the rows it was drawn from change.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::database::{DailyCategoryTotal, DayTotal, MonthTotal, MonthlyCategoryTotal};

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 72.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 56.0;
const MARGIN_BOTTOM: f64 = 64.0;
const GRID_LINES: u32 = 5;

const INCOME_COLOR: &str = "#2e9e5b";
const EXPENSE_COLOR: &str = "#d9534f";
const CATEGORY_COLOR: &str = "#4e79a7";

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One coloured series of bars.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub values: Vec<f64>,
}

/// A grouped bar chart: one group per label, one bar per series in a group.
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub unit: String,
}

impl BarChart {
    fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max)
    }

    /// Render as a standalone SVG document.
    pub fn render(&self) -> String {
        let mut svg = String::with_capacity(8 * 1024);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = write!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = write!(
            svg,
            r#"<text x="{}" y="32" font-size="20" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            escape(&self.title)
        );

        let max = self.max_value();
        if max <= 0.0 || self.labels.is_empty() {
            let _ = write!(
                svg,
                r##"<text x="{}" y="{}" font-size="16" text-anchor="middle" fill="#888">No data for this period</text>"##,
                WIDTH / 2.0,
                HEIGHT / 2.0
            );
            svg.push_str("</svg>");
            return svg;
        }

        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let base_y = MARGIN_TOP + plot_h;
        let scale = nice_ceiling(max);

        for i in 0..=GRID_LINES {
            let value = scale * f64::from(i) / f64::from(GRID_LINES);
            let y = base_y - plot_h * value / scale;
            let _ = write!(
                svg,
                r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="#e5e5e5"/><text x="{}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"##,
                WIDTH - MARGIN_RIGHT,
                MARGIN_LEFT - 6.0,
                y + 4.0,
                format_amount(value)
            );
        }

        let group_w = plot_w / self.labels.len() as f64;
        let bar_w = (group_w * 0.8) / self.series.len().max(1) as f64;
        for (i, label) in self.labels.iter().enumerate() {
            let group_x = MARGIN_LEFT + group_w * i as f64 + group_w * 0.1;
            for (j, series) in self.series.iter().enumerate() {
                let value = series.values.get(i).copied().unwrap_or(0.0);
                if value <= 0.0 {
                    continue;
                }
                let h = plot_h * value / scale;
                let _ = write!(
                    svg,
                    r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{h:.1}" fill="{}"><title>{}: {} {}</title></rect>"#,
                    group_x + bar_w * j as f64,
                    base_y - h,
                    bar_w,
                    series.color,
                    escape(&series.name),
                    format_amount(value),
                    escape(&self.unit)
                );
            }
            let _ = write!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
                group_x + group_w * 0.4,
                base_y + 16.0,
                escape(label)
            );
        }

        for (j, series) in self.series.iter().enumerate() {
            let x = MARGIN_LEFT + 140.0 * j as f64;
            let y = HEIGHT - 20.0;
            let _ = write!(
                svg,
                r#"<rect x="{x}" y="{}" width="12" height="12" fill="{}"/><text x="{}" y="{y}" font-size="12">{}</text>"#,
                y - 10.0,
                series.color,
                x + 16.0,
                escape(&series.name)
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

/// Income against expense for every day of a month.
pub fn daily_report(
    year: i32,
    month: u32,
    incomes: &[DayTotal],
    expenses: &[DailyCategoryTotal],
    currency: &str,
) -> String {
    let days = days_in_month(year, month);
    let mut income = vec![0.0; days];
    let mut spent = vec![0.0; days];
    for row in incomes {
        if let Some(slot) = day_slot(row.day, days) {
            income[slot] += row.total;
        }
    }
    for row in expenses {
        if let Some(slot) = day_slot(row.day, days) {
            spent[slot] += row.total;
        }
    }

    BarChart {
        title: format!("{} {year}: income vs expenses", month_name(month)),
        labels: (1..=days).map(|d| d.to_string()).collect(),
        series: vec![
            Series {
                name: "Income".into(),
                color: INCOME_COLOR.into(),
                values: income,
            },
            Series {
                name: "Expenses".into(),
                color: EXPENSE_COLOR.into(),
                values: spent,
            },
        ],
        unit: currency.to_string(),
    }
    .render()
}

/// Income against expense for every month of a year.
pub fn monthly_report(year: i32, incomes: &[MonthTotal], expenses: &[MonthlyCategoryTotal], currency: &str) -> String {
    let mut income = vec![0.0; 12];
    let mut spent = vec![0.0; 12];
    for row in incomes {
        if let Some(slot) = month_slot(row.month) {
            income[slot] += row.total;
        }
    }
    for row in expenses {
        if let Some(slot) = month_slot(row.month) {
            spent[slot] += row.total;
        }
    }

    BarChart {
        title: format!("{year}: income vs expenses by month"),
        labels: MONTH_LABELS.iter().map(|m| m.to_string()).collect(),
        series: vec![
            Series {
                name: "Income".into(),
                color: INCOME_COLOR.into(),
                values: income,
            },
            Series {
                name: "Expenses".into(),
                color: EXPENSE_COLOR.into(),
                values: spent,
            },
        ],
        unit: currency.to_string(),
    }
    .render()
}

/// Spending per category over a year, largest first.
pub fn yearly_report(year: i32, expenses: &[MonthlyCategoryTotal], currency: &str) -> String {
    let mut per_category: BTreeMap<&str, f64> = BTreeMap::new();
    for row in expenses {
        *per_category.entry(row.category.as_str()).or_default() += row.total;
    }
    let mut totals: Vec<(&str, f64)> = per_category.into_iter().collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    BarChart {
        title: format!("{year}: expenses by category"),
        labels: totals.iter().map(|(name, _)| name.to_string()).collect(),
        series: vec![Series {
            name: "Expenses".into(),
            color: CATEGORY_COLOR.into(),
            values: totals.iter().map(|(_, total)| *total).collect(),
        }],
        unit: currency.to_string(),
    }
    .render()
}

fn days_in_month(year: i32, month: u32) -> usize {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as usize,
        _ => 31,
    }
}

fn day_slot(day: i32, days: usize) -> Option<usize> {
    usize::try_from(day).ok().filter(|d| (1..=days).contains(d)).map(|d| d - 1)
}

fn month_slot(month: i32) -> Option<usize> {
    usize::try_from(month).ok().filter(|m| (1..=12).contains(m)).map(|m| m - 1)
}

fn month_name(month: u32) -> &'static str {
    MONTH_LABELS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

/// Round up to 1, 2 or 5 times a power of ten.
fn nice_ceiling(value: f64) -> f64 {
    let magnitude = 10f64.powf(value.log10().floor());
    let normalized = value / magnitude;
    let step = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    step * magnitude
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(svg: &str) -> usize {
        svg.matches(r#"class="bar""#).count()
    }

    #[test]
    fn test_daily_report_draws_one_bar_per_nonzero_value() {
        let incomes = [DayTotal { day: 1, total: 1000.0 }];
        let expenses = [
            DailyCategoryTotal { day: 1, category: "Coffee".into(), total: 50.0 },
            DailyCategoryTotal { day: 1, category: "Fuel".into(), total: 300.0 },
            DailyCategoryTotal { day: 15, category: "Coffee".into(), total: 40.0 },
        ];
        let svg = daily_report(2024, 2, &incomes, &expenses, "UAH");

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Feb 2024"));
        // Income on day 1; expenses on days 1 and 15 collapse per day
        assert_eq!(bars(&svg), 3);
        assert!(svg.contains(">29</text>"));
        assert!(!svg.contains(">30</text>"));
    }

    #[test]
    fn test_out_of_range_rows_are_ignored() {
        let incomes = [DayTotal { day: 40, total: 10.0 }];
        let svg = daily_report(2024, 4, &incomes, &[], "UAH");
        assert!(svg.contains("No data for this period"));
    }

    #[test]
    fn test_monthly_report_has_twelve_groups() {
        let incomes = [MonthTotal { month: 3, total: 500.0 }];
        let expenses = [MonthlyCategoryTotal { month: 3, category: "Fuel".into(), total: 200.0 }];
        let svg = monthly_report(2024, &incomes, &expenses, "UAH");

        for label in MONTH_LABELS {
            assert!(svg.contains(&format!(">{label}</text>")), "{label}");
        }
        assert_eq!(bars(&svg), 2);
    }

    #[test]
    fn test_yearly_report_escapes_category_names() {
        let expenses = [
            MonthlyCategoryTotal { month: 1, category: "Food & <Drinks>".into(), total: 10.0 },
            MonthlyCategoryTotal { month: 2, category: "Food & <Drinks>".into(), total: 15.0 },
        ];
        let svg = yearly_report(2024, &expenses, "UAH");

        assert!(svg.contains("Food &amp; &lt;Drinks&gt;"));
        assert!(!svg.contains("<Drinks>"));
        assert!(svg.contains("Expenses: 25 UAH"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let expenses = [MonthlyCategoryTotal { month: 5, category: "Coffee".into(), total: 12.5 }];
        assert_eq!(yearly_report(2024, &expenses, "UAH"), yearly_report(2024, &expenses, "UAH"));
    }

    #[test]
    fn test_nice_ceiling() {
        assert_eq!(nice_ceiling(7.0), 10.0);
        assert_eq!(nice_ceiling(130.0), 200.0);
        assert_eq!(nice_ceiling(450.0), 500.0);
        assert_eq!(nice_ceiling(1000.0), 1000.0);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
