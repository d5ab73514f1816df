use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Weekday};
use unicode_width::UnicodeWidthStr;

use crate::activity::Activity;
use crate::config::Config;
use crate::indicator::Indicator;

const PENDING_CELL: &str = "41";
const COMPLETED_ROW: &str = "2";
const SELECTION_INDEX: &str = "33";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    week_start: Weekday,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color,
            week_start: cfg.week_start()?,
        })
    }

    /// Numbered list of a date's activities; the numbers are what `done`
    /// and `delete` refer to.
    #[tracing::instrument(skip(self, out, activities), fields(count = activities.len()))]
    pub fn print_activity_list<W: Write>(
        &self,
        out: &mut W,
        date: NaiveDate,
        activities: &[&Activity],
    ) -> anyhow::Result<()> {
        writeln!(out, "{} ({})", date.format("%Y-%m-%d"), date.format("%A"))?;
        if activities.is_empty() {
            writeln!(out, "No activities.")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "Time".to_string(),
            "Activity".to_string(),
            "Status".to_string(),
        ];

        let rows = activities
            .iter()
            .enumerate()
            .map(|(idx, activity)| {
                let status = if activity.is_completed() {
                    "done"
                } else {
                    "pending"
                };
                let row = vec![
                    self.paint(&(idx + 1).to_string(), SELECTION_INDEX),
                    activity.time().format("%H:%M").to_string(),
                    activity.name().to_string(),
                    status.to_string(),
                ];
                if activity.is_completed() {
                    row.into_iter()
                        .map(|cell| self.paint(&strip_ansi(&cell), COMPLETED_ROW))
                        .collect()
                } else {
                    row
                }
            })
            .collect();

        write_table(out, headers, rows)
    }

    /// Month grid; pending days get a red cell (or a `*` without color) and
    /// the selected day is marked with `>`.
    #[tracing::instrument(skip(self, out, days))]
    pub fn print_calendar<W: Write>(
        &self,
        out: &mut W,
        days: &[(NaiveDate, Indicator)],
        selected: NaiveDate,
    ) -> anyhow::Result<()> {
        let Some((first, _)) = days.first() else {
            return Ok(());
        };
        writeln!(out, "{}", first.format("%B %Y"))?;

        let mut weekday = self.week_start;
        let mut labels = Vec::with_capacity(7);
        for _ in 0..7 {
            labels.push(format!(" {} ", &weekday.to_string()[..2]));
            weekday = weekday.succ();
        }
        writeln!(out, "{}", labels.join(" ").trim_end())?;

        let lead = (first.weekday().num_days_from_monday() + 7
            - self.week_start.num_days_from_monday())
            % 7;
        let mut cells: Vec<String> = vec!["    ".to_string(); lead as usize];

        for (date, indicator) in days {
            let prefix = if *date == selected { '>' } else { ' ' };
            let suffix = if indicator.is_pending() && !self.color {
                '*'
            } else {
                ' '
            };
            let text = format!("{prefix}{:>2}{suffix}", date.day());
            cells.push(if indicator.is_pending() {
                self.paint(&text, PENDING_CELL)
            } else {
                text
            });
        }

        for week in cells.chunks(7) {
            writeln!(out, "{}", week.join(" ").trim_end())?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
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

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| {
                let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
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
