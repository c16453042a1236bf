use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::classifier::Classification;
use crate::config::Config;
use crate::registry::WeekTableRegistry;
use crate::table::WeekKind;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, out, rows), fields(count = rows.len()))]
    pub fn print_classifications(
        &self,
        out: &mut dyn Write,
        rows: &[Classification],
    ) -> anyhow::Result<()> {
        let color = self.color && io::stdout().is_terminal();
        write_classifications(out, rows, color)
    }

    #[tracing::instrument(skip(self, out, registry))]
    pub fn print_registry_summary(
        &self,
        out: &mut dyn Write,
        registry: &WeekTableRegistry,
    ) -> anyhow::Result<()> {
        write_registry_summary(out, registry)
    }
}

pub fn write_classifications<W: Write>(
    writer: W,
    rows: &[Classification],
    color: bool,
) -> anyhow::Result<()> {
    let headers = vec![
        "Date".to_string(),
        "Day".to_string(),
        "ISO week".to_string(),
        "Code".to_string(),
        "Label".to_string(),
    ];

    let rows = rows
        .iter()
        .map(|row| {
            let label = if color {
                paint(&row.label, kind_color(row.kind))
            } else {
                row.label.clone()
            };
            vec![
                row.date.to_string(),
                row.date.weekday().to_string(),
                format!("{:04}-W{:02}", row.iso_year, row.week_number),
                row.code.to_string(),
                label,
            ]
        })
        .collect();

    write_table(writer, headers, rows)
}

pub fn write_registry_summary<W: Write>(
    writer: W,
    registry: &WeekTableRegistry,
) -> anyhow::Result<()> {
    let headers = vec![
        "Year".to_string(),
        "Weeks".to_string(),
        "Teaching".to_string(),
        "Blocus".to_string(),
        "Breaks".to_string(),
    ];

    let rows = registry
        .iter()
        .map(|(year, table)| {
            let count = |wanted: &[WeekKind]| {
                table
                    .codes()
                    .iter()
                    .filter(|&&code| wanted.contains(&WeekKind::from_code(code)))
                    .count()
            };
            vec![
                year.to_string(),
                table.len().to_string(),
                table.teaching_weeks().to_string(),
                count(&[WeekKind::Blocus]).to_string(),
                count(&[WeekKind::Break, WeekKind::Easter]).to_string(),
            ]
        })
        .collect();

    write_table(writer, headers, rows)
}

fn kind_color(kind: WeekKind) -> &'static str {
    match kind {
        WeekKind::Teaching(_) => "32",
        WeekKind::Blocus => "31",
        WeekKind::Easter | WeekKind::Break => "33",
        WeekKind::Unclassified => "2",
    }
}

fn paint(text: &str, code: &str) -> String {
    format!("\x1b[{code}m{text}\x1b[0m")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
