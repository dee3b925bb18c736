pub mod agenda;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod date;
pub mod matcher;
pub mod month_grid;
pub mod project;
pub mod recurrence;
pub mod render;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::date::{
  CalendarMonth,
  DateKey,
  InvalidDateError
};
pub use crate::month_grid::Cell;
pub use crate::project::{
  Milestone,
  Project
};
pub use crate::recurrence::{
  RecurrenceKind,
  RecurrenceRule
};
pub use crate::task::Task;

/// CLI entry point. The wall clock is
/// read once here and passed down.
#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let global = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );
  cli::init_tracing(
    global.verbose,
    global.quiet
  )?;
  debug!(
    positional = pre.rc_overrides.len(),
    flagged = global.rc_overrides.len(),
    "hearth starting"
  );

  let cfg = settings(
    &global,
    pre.rc_overrides
  )?;
  let data_dir =
    config::resolve_data_dir(
      &cfg,
      global.data.as_deref()
    )
    .context(
      "cannot resolve the hearth data \
       directory"
    )?;
  let mut store =
    datastore::DataStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "cannot open task store in {}",
        data_dir.display()
      )
    })?;

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg,
    global.rest
  )?;
  let command = inv.command.clone();

  commands::dispatch(
    &mut store,
    &cfg,
    &mut renderer,
    inv,
    DateKey::today(),
    Utc::now()
  )?;

  info!(%command, "finished");
  Ok(())
}

/// rc file first, then `--rc` flags,
/// then positional `rc.key=value`
/// tokens, later sources winning.
fn settings(
  global: &cli::GlobalCli,
  positional: Vec<(String, String)>
) -> anyhow::Result<config::Config> {
  let mut cfg = config::Config::load(
    global.hearthrc.as_deref()
  )?;
  let flagged = global
    .rc_overrides
    .iter()
    .map(|kv| {
      (kv.key.clone(), kv.value.clone())
    });
  cfg.apply_overrides(
    flagged.chain(positional)
  );
  Ok(cfg)
}
