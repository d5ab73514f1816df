pub mod activity;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod indicator;
pub mod render;
pub mod store;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use activity::{
  Activity,
  ActivityId,
  ActivityKind
};
pub use error::ValidationError;
pub use indicator::{
  Indicator,
  indicator_for
};
pub use store::{
  ActivityStore,
  Affected,
  Change
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daybook"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.daybookrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let renderer =
    render::Renderer::new(&cfg)?;

  let today = Local::now().date_naive();
  let selected = match cli.date.as_deref()
  {
    | Some(raw) => {
      datetime::parse_date_expr(
        raw, today
      )
      .context(
        "invalid --date value"
      )?
    }
    | None => today
  };
  let mut session =
    commands::Session::new(
      today, selected
    );

  let mut out = io::stdout().lock();

  if !cli.rest.is_empty() {
    let line = cli
      .rest
      .iter()
      .map(|arg| {
        arg.to_string_lossy().to_string()
      })
      .collect::<Vec<_>>()
      .join(" ");
    debug!(line = %line, "running single command");
    session.execute(
      &line, &cfg, &renderer, &mut out
    )?;
  } else {
    let stdin = io::stdin();
    let show_prompt =
      stdin.is_terminal();
    commands::run_interactive(
      &mut session,
      &cfg,
      &renderer,
      stdin.lock(),
      &mut out,
      show_prompt
    )?;
  }

  info!(
    activities = session.store().len(),
    "done"
  );
  Ok(())
}
