//! Rendering of a [`TestComparator`] into markdown, git-plain, HTML or JSON.
//!
//! Every table shares one five-column layout. Results use
//! `TEST MIN MAX MEAN MAX_RSS`, comparisons `TEST OLD NEW DELTA SPEEDUP`, and
//! each column is padded to its widest value across the whole report.

use crate::compare::{ResultComparison, TestComparator};
use crate::config::CompareConfig;
use crate::error::Result;
use crate::result::PerformanceResult;
use crate::schema::{ComparisonEntry, ComparisonReport, ResultEntry, RunMeta};
use crate::ReportFormat;

pub const RESULT_HEADER: [&str; 5] = ["TEST", "MIN", "MAX", "MEAN", "MAX_RSS"];
pub const COMPARISON_HEADER: [&str; 5] = ["TEST", "OLD", "NEW", "DELTA", "SPEEDUP"];

const PLACEHOLDER: &str = "—";

pub type Columns = [String; 5];

pub fn result_values(result: &PerformanceResult) -> Columns {
    [
        result.name.clone(),
        result.min.to_string(),
        result.max.to_string(),
        result
            .mean
            .map_or_else(|| PLACEHOLDER.to_string(), |m| (m.trunc() as u64).to_string()),
        result
            .max_rss
            .filter(|&rss| rss > 0)
            .map_or_else(|| PLACEHOLDER.to_string(), |rss| rss.to_string()),
    ]
}

pub fn comparison_values(cmp: &ResultComparison<'_>) -> Columns {
    [
        cmp.name.to_string(),
        cmp.old.min.to_string(),
        cmp.new.min.to_string(),
        format!("{:+.1}%", cmp.delta),
        format!(
            "{:.2}x{}",
            cmp.ratio,
            if cmp.is_dubious { " (?)" } else { "" }
        ),
    ]
}

struct Section {
    title: &'static str,
    header: [&'static str; 5],
    rows: Vec<Columns>,
    /// Emphasise the speedup column.
    strong: bool,
    open: bool,
    color: &'static str,
}

struct TextStyle {
    separator: &'static str,
    header_separator: &'static str,
    detail: fn(title: &str, count: usize, table: &str, open: bool) -> String,
}

fn markdown_detail(title: &str, count: usize, table: &str, open: bool) -> String {
    format!(
        "\n<details {}>\n  <summary>{title} ({count})</summary>\n  {table}\n</details>\n",
        if open { "open" } else { "" }
    )
}

fn git_detail(title: &str, count: usize, table: &str, _open: bool) -> String {
    format!("\n{title} ({count}): {table}")
}

const MARKDOWN: TextStyle = TextStyle {
    separator: " | ",
    header_separator: "---",
    detail: markdown_detail,
};

const GIT: TextStyle = TextStyle {
    separator: "   ",
    header_separator: "   ",
    detail: git_detail,
};

pub struct ReportFormatter<'c, 'a> {
    comparator: &'c TestComparator<'a>,
    config: &'c CompareConfig,
}

impl<'c, 'a> ReportFormatter<'c, 'a> {
    pub fn new(comparator: &'c TestComparator<'a>, config: &'c CompareConfig) -> Self {
        Self { comparator, config }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Markdown => self.markdown(),
            ReportFormat::Git => self.git(),
            ReportFormat::Html => self.html(),
            ReportFormat::Json => self.json()?,
        })
    }

    fn sections(&self) -> Vec<Section> {
        let tc = self.comparator;
        let mut sections = vec![
            comparison_section("Regression", &tc.decreased, true, true, "red"),
            comparison_section("Improvement", &tc.increased, true, false, "green"),
        ];
        if !self.config.changes_only {
            sections.push(comparison_section(
                "No Changes",
                &tc.unchanged,
                false,
                false,
                "black",
            ));
        }
        sections.push(result_section("Added", &tc.added));
        sections.push(result_section("Removed", &tc.removed));
        sections
    }

    fn column_widths(sections: &[Section]) -> [usize; 5] {
        let mut widths = [0usize; 5];
        let headers = [RESULT_HEADER, COMPARISON_HEADER];
        let header_cells = headers.iter().flat_map(|h| h.iter().copied());
        let value_cells = sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .flat_map(|row| row.iter().map(String::as_str));

        for (i, cell) in header_cells.chain(value_cells).enumerate() {
            let col = i % 5;
            widths[col] = widths[col].max(cell.chars().count());
        }
        widths
    }

    pub fn markdown(&self) -> String {
        self.formatted_text(&MARKDOWN)
    }

    pub fn git(&self) -> String {
        self.formatted_text(&GIT)
    }

    fn formatted_text(&self, style: &TextStyle) -> String {
        let sections = self.sections();
        let widths = Self::column_widths(&sections);

        let row = |cells: [&str; 5]| {
            let justified: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(cell, w)| format!("{cell:<w$}"))
                .collect();
            format!("{} \n", justified.join(style.separator))
        };

        let mut out = String::new();
        for section in sections.iter().filter(|s| !s.rows.is_empty()) {
            let mut table = String::from("\n");
            table.push_str(&row(section.header));
            table.push_str(&row([style.header_separator; 5]));
            for values in &section.rows {
                let last = if section.strong {
                    format!("**{}**", values[4])
                } else {
                    values[4].clone()
                };
                table.push_str(&row([
                    values[0].as_str(),
                    values[1].as_str(),
                    values[2].as_str(),
                    values[3].as_str(),
                    last.as_str(),
                ]));
            }
            out.push_str(&(style.detail)(
                section.title,
                section.rows.len(),
                &table,
                section.open,
            ));
        }
        out
    }

    pub fn html(&self) -> String {
        let mut rows = String::new();
        for section in self.sections().iter().filter(|s| !s.rows.is_empty()) {
            let h = section.header;
            rows.push_str(&format!(
                "
        <tr>
                <th align='left'>{} ({})</th>
                <th align='left'>{}</th>
                <th align='left'>{}</th>
                <th align='left'>{}</th>
                <th align='left'>{}</th>
        </tr>
",
                section.title,
                section.rows.len(),
                h[1],
                h[2],
                h[3],
                h[4]
            ));
            for v in &section.rows {
                rows.push_str(&format!(
                    "
        <tr>
                <td align='left'>{}</td>
                <td align='left'>{}</td>
                <td align='left'>{}</td>
                <td align='left'>{}</td>
                <td align='left'><font color='{}'>{}</font></td>
        </tr>
",
                    v[0], v[1], v[2], v[3], section.color, v[4]
                ));
            }
        }

        format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="Content-Type" content="text/html; charset=utf-8" />
    <style>
        body {{ font-family: -apple-system, sans-serif; font-size: 14px; }}
        table {{ border-spacing: 2px; border-color: gray; border-spacing: 0;
                border-collapse: collapse; }}
        table tr {{ background-color: #fff; border-top: 1px solid #c6cbd1; }}
        table th, table td {{ padding: 6px 13px; border: 1px solid #dfe2e5; }}
        th {{ text-align: center; padding-top: 130px; }}
        td {{ text-align: right; }}
        table td:first-child {{ text-align: left; }}
        tr:nth-child(even) {{ background-color: #000000; }}
        tr:nth-child(2n) {{ background-color: #f6f8fa; }}
    </style>
</head>
<body>
<table>
{rows}
</table>
</body>
</html>"#
        )
    }

    pub fn to_report(&self) -> ComparisonReport {
        let tc = self.comparator;
        ComparisonReport {
            run: RunMeta::new(self.config),
            regressions: tc.decreased.iter().map(comparison_entry).collect(),
            improvements: tc.increased.iter().map(comparison_entry).collect(),
            unchanged: if self.config.changes_only {
                Vec::new()
            } else {
                tc.unchanged.iter().map(comparison_entry).collect()
            },
            added: tc.added.iter().map(|r| result_entry(r)).collect(),
            removed: tc.removed.iter().map(|r| result_entry(r)).collect(),
        }
    }

    pub fn json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_report())?)
    }
}

fn comparison_section(
    title: &'static str,
    items: &[ResultComparison<'_>],
    strong: bool,
    open: bool,
    color: &'static str,
) -> Section {
    Section {
        title,
        header: COMPARISON_HEADER,
        rows: items.iter().map(comparison_values).collect(),
        strong,
        open,
        color,
    }
}

fn result_section(title: &'static str, items: &[&PerformanceResult]) -> Section {
    Section {
        title,
        header: RESULT_HEADER,
        rows: items.iter().map(|r| result_values(r)).collect(),
        strong: false,
        open: true,
        color: "",
    }
}

fn comparison_entry(cmp: &ResultComparison<'_>) -> ComparisonEntry {
    ComparisonEntry {
        name: cmp.name.to_string(),
        old_min: cmp.old.min,
        new_min: cmp.new.min,
        ratio: cmp.ratio,
        delta_percent: cmp.delta,
        is_dubious: cmp.is_dubious,
        columns: comparison_values(cmp).to_vec(),
    }
}

fn result_entry(result: &PerformanceResult) -> ResultEntry {
    ResultEntry {
        name: result.name.clone(),
        num_samples: result.num_samples,
        min: result.min,
        max: result.max,
        mean: result.mean,
        sd: result.sd,
        median: result.median,
        max_rss: result.max_rss,
        columns: result_values(result).to_vec(),
    }
}
