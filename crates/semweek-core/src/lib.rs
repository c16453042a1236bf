pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod labels;
pub mod registry;
pub mod render;
pub mod table;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::classifier::{
  AcademicWeekClassifier,
  Classification,
  GridWeekStart
};
pub use crate::datetime::{
  CalendarDate,
  IsoWeek,
  iso_week_number
};
pub use crate::error::{
  InvalidDateError,
  TableError
};
pub use crate::labels::{
  LabelCatalog,
  LabelResolver,
  Locale
};
pub use crate::registry::{
  SharedRegistry,
  WeekTableRegistry
};
pub use crate::table::{
  WeekClassificationTable,
  WeekKind
};

pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let stdout = io::stdout();
  let mut out = stdout.lock();
  run_with_output(raw_args, &mut out)?;
  out.flush()?;
  Ok(())
}

/// Same as [`run`], with command output
/// sent to `out` instead of stdout.
#[tracing::instrument(skip_all)]
pub fn run_with_output(
  raw_args: Vec<OsString>,
  out: &mut dyn Write
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
    "starting semweek CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.weekrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  if let Some(locale) = cli.locale {
    cfg.apply_overrides([(
      "locale".to_string(),
      locale
    )]);
  }

  let registry =
    match config::resolve_weeks_file(
      &cfg,
      cli.weeks.as_deref()
    ) {
      | Some(path) => {
        WeekTableRegistry::load(&path)
          .with_context(|| {
            format!(
              "failed to load week \
               tables from {}",
              path.display()
            )
          })?
      }
      | None => {
        debug!(
          "using built-in week tables"
        );
        WeekTableRegistry::builtin()
          .context(
            "built-in week tables are \
             invalid"
          )?
      }
    };

  let labels =
    LabelCatalog::from_config(&cfg)?;
  let classifier =
    AcademicWeekClassifier::new(
      Arc::new(registry),
      labels
    );

  let renderer =
    render::Renderer::new(&cfg)?;
  let tz =
    datetime::resolve_timezone(&cfg);
  let today =
    datetime::today_in(&tz, Utc::now())?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let session = commands::Session {
    classifier: &classifier,
    cfg: &cfg,
    renderer: &renderer,
    locale: cfg.locale()?,
    today
  };
  commands::dispatch(
    &session, inv, out
  )?;

  info!("done");
  Ok(())
}
