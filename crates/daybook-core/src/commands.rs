use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, instrument, warn};

use crate::activity::{Activity, ActivityId};
use crate::config::Config;
use crate::datetime::{parse_date_expr, parse_month_expr};
use crate::error::ValidationError;
use crate::indicator::month_indicators;
use crate::render::Renderer;
use crate::store::{ActivityStore, Change};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "select", "date", "list", "done", "delete", "calendar", "export", "clear",
        "config", "help", "quit", "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// One input line split into a resolved command name and its raw argument
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: String,
}

impl Invocation {
    pub fn parse(cfg: &Config, line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let line = if line.is_empty() {
            let cmd = cfg.default_command();
            debug!(command = %cmd, "empty input, using default command");
            cmd
        } else {
            line.to_string()
        };

        let (token, args) = match line.split_once(char::is_whitespace) {
            Some((token, args)) => (token, args.trim_start()),
            None => (line.as_str(), ""),
        };

        let lower = token.to_ascii_lowercase();
        let command = expand_command_abbrev(&lower, &known_command_names())
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {token} (try `help`)"))?;

        Ok(Self {
            command: command.to_string(),
            args: args.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// State of one interactive session: the store it owns, the date the user
/// is looking at, and the list last shown to them.
#[derive(Debug)]
pub struct Session {
    store: ActivityStore,
    today: NaiveDate,
    selected: NaiveDate,
    view_date: Option<NaiveDate>,
    view: Vec<ActivityId>,
}

impl Session {
    pub fn new(today: NaiveDate, selected: NaiveDate) -> Self {
        Self {
            store: ActivityStore::new(),
            today,
            selected,
            view_date: None,
            view: vec![],
        }
    }

    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    /// Validates raw input and adds it on the selected date.
    #[instrument(skip(self))]
    pub fn add_activity(&mut self, time: &str, name: &str) -> Result<&Activity, ValidationError> {
        let activity = Activity::create(Some(self.selected), name, time)?;
        let (stored, change) = self.store.add(activity);
        info!(?change, "activity scheduled");
        Ok(stored)
    }

    #[instrument(skip(self, cfg, renderer, out))]
    pub fn execute<W: Write>(
        &mut self,
        line: &str,
        cfg: &Config,
        renderer: &Renderer,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        let inv = Invocation::parse(cfg, line)?;
        let args = inv.args.as_str();
        debug!(command = %inv.command, args, "dispatching command");

        match inv.command.as_str() {
            "add" => self.cmd_add(renderer, args, out)?,
            "select" | "date" => self.cmd_select(renderer, args, out)?,
            "list" => self.cmd_list(renderer, args, out)?,
            "done" => self.cmd_done(renderer, args, out)?,
            "delete" => self.cmd_delete(renderer, args, out)?,
            "calendar" => self.cmd_calendar(renderer, args, out)?,
            "export" => self.cmd_export(args, out)?,
            "clear" => self.cmd_clear(out)?,
            "config" => cmd_config(cfg, out)?,
            "help" => cmd_help(out)?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => return Err(anyhow!("unknown command: {other}")),
        }

        Ok(Flow::Continue)
    }

    fn cmd_add<W: Write>(
        &mut self,
        renderer: &Renderer,
        args: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let (time, name) = args
            .split_once(char::is_whitespace)
            .map(|(time, name)| (time, name.trim_start()))
            .unwrap_or((args, ""));

        let added = match self.add_activity(time, name) {
            Ok(activity) => activity.describe(),
            Err(err) if err.is_missing() => {
                return Err(anyhow::Error::new(err)
                    .context("incomplete activity data: give a time and a name, e.g. `add 15:30 Meeting`"));
            }
            Err(err) => return Err(err.into()),
        };

        writeln!(out, "Added: {added}")?;
        self.show_list(renderer, self.selected, out)
    }

    fn cmd_select<W: Write>(
        &mut self,
        renderer: &Renderer,
        args: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        if args.trim().is_empty() {
            return Err(anyhow!("select needs a date, e.g. `select 2024-05-01`"));
        }
        self.selected = parse_date_expr(args, self.today)?;
        info!(selected = %self.selected, "selected date changed");
        self.show_list(renderer, self.selected, out)
    }

    fn cmd_list<W: Write>(
        &mut self,
        renderer: &Renderer,
        args: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let date = self.date_arg(args)?;
        self.show_list(renderer, date, out)
    }

    fn cmd_done<W: Write>(
        &mut self,
        renderer: &Renderer,
        args: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let id = self.resolve_selection(args)?;
        let change = self
            .store
            .mark_completed(id)
            .ok_or_else(|| anyhow!("that activity no longer exists; run `list` again"))?;
        if let Some(activity) = self.store.get(id) {
            writeln!(out, "Completed: {}", activity.describe())?;
        }
        self.refresh(renderer, &change, out)
    }

    fn cmd_delete<W: Write>(
        &mut self,
        renderer: &Renderer,
        args: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let id = self.resolve_selection(args)?;
        let change = self
            .store
            .remove(id)
            .ok_or_else(|| anyhow!("that activity no longer exists; run `list` again"))?;
        if let Change::Removed { activity } = &change {
            writeln!(out, "Deleted: {}", activity.describe())?;
        }
        self.refresh(renderer, &change, out)
    }

    fn cmd_calendar<W: Write>(
        &mut self,
        renderer: &Renderer,
        args: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let (year, month) = if args.trim().is_empty() {
            (self.selected.year(), self.selected.month())
        } else {
            parse_month_expr(args)?
        };
        let days = month_indicators(year, month, &self.store)?;
        renderer.print_calendar(out, &days, self.selected)
    }

    fn cmd_export<W: Write>(&mut self, args: &str, out: &mut W) -> anyhow::Result<()> {
        let date = self.date_arg(args)?;
        let activities = self.store.query_by_date(date);
        let json =
            serde_json::to_string_pretty(&activities).context("failed to serialize activities")?;
        writeln!(out, "{json}")?;
        Ok(())
    }

    fn cmd_clear<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let change = self.store.clear();
        self.view.clear();
        self.view_date = None;
        if let Change::Cleared { count } = change {
            writeln!(out, "Removed {count} activities.")?;
        }
        Ok(())
    }

    fn date_arg(&self, args: &str) -> anyhow::Result<NaiveDate> {
        if args.trim().is_empty() {
            Ok(self.selected)
        } else {
            parse_date_expr(args, self.today)
        }
    }

    /// Maps a 1-based position in the last shown list to an activity id.
    fn resolve_selection(&self, args: &str) -> anyhow::Result<ActivityId> {
        let raw = args.trim();
        let position: usize = raw
            .parse()
            .with_context(|| format!("expected a list number, got `{raw}`"))?;
        if position == 0 || position > self.view.len() {
            return Err(anyhow!(
                "no activity #{position} in the current list ({} shown)",
                self.view.len()
            ));
        }
        Ok(self.view[position - 1])
    }

    fn show_list<W: Write>(
        &mut self,
        renderer: &Renderer,
        date: NaiveDate,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let activities = self.store.query_by_date(date);
        renderer.print_activity_list(out, date, &activities)?;
        self.view = activities.iter().map(|a| a.id()).collect();
        self.view_date = Some(date);
        Ok(())
    }

    /// Redraws the current list when the change touched its date.
    fn refresh<W: Write>(
        &mut self,
        renderer: &Renderer,
        change: &Change,
        out: &mut W,
    ) -> anyhow::Result<()> {
        match self.view_date {
            Some(date) if change.affected().covers(date) => self.show_list(renderer, date, out),
            _ => Ok(()),
        }
    }
}

/// Reads commands line by line until EOF or `quit`. A failing command is
/// reported and the session carries on.
#[instrument(skip_all)]
pub fn run_interactive<R: BufRead, W: Write>(
    session: &mut Session,
    cfg: &Config,
    renderer: &Renderer,
    input: R,
    out: &mut W,
    show_prompt: bool,
) -> anyhow::Result<()> {
    let prompt = cfg.prompt();
    let mut lines = input.lines();

    loop {
        if show_prompt {
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            debug!("end of input");
            break;
        };
        let line = line.context("failed to read command")?;

        match session.execute(&line, cfg, renderer, out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => {
                warn!(error = %err, "command failed");
                writeln!(out, "error: {err:#}")?;
            }
        }
    }

    Ok(())
}

fn cmd_config<W: Write>(cfg: &Config, out: &mut W) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        writeln!(out, "{key}={value}")?;
    }
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "\
Commands (any unique prefix works):
  add <HH:MM> <name>   add an activity on the selected date
  select <date>        change the selected date (YYYY-MM-DD, today, monday, +2d, ...)
  list [date]          list activities for a date
  done <n>             mark item n of the last list as completed
  delete <n>           delete item n of the last list
  calendar [YYYY-MM]   month view; pending days are highlighted
  export [date]        print a date's activities as JSON
  clear                remove every activity
  config               show effective settings
  quit                 leave"
    )?;
    Ok(())
}
