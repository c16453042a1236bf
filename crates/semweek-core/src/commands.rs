use std::io::Write;
use std::path::Path;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::classifier::{AcademicWeekClassifier, Classification};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{CalendarDate, parse_date_expr};
use crate::labels::{LabelResolver, Locale};
use crate::registry::WeekTableRegistry;
use crate::render::Renderer;
use crate::table::{CODE_BLOCUS, CODE_BREAK, CODE_EASTER, CODE_UNCLASSIFIED};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "week",
        "cell",
        "weeks",
        "years",
        "labels",
        "check",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
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

/// Everything a command needs besides its arguments.
pub struct Session<'a, R: LabelResolver> {
    pub classifier: &'a AcademicWeekClassifier<R>,
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub locale: Locale,
    pub today: CalendarDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        match cfg
            .get("output.format")
            .unwrap_or_else(|| "table".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("invalid output.format: {other} (expected table or json)")),
        }
    }
}

/// Runs one command, writing its output to `out`.
#[instrument(skip(session, inv, out))]
pub fn dispatch<R: LabelResolver>(
    session: &Session<'_, R>,
    inv: Invocation,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();

    debug!(
        command,
        args = ?inv.command_args,
        locale = %session.locale,
        today = %session.today,
        "dispatching command"
    );

    match command {
        "week" => cmd_week(session, &inv.command_args, out),
        "cell" => cmd_cell(session, &inv.command_args, out),
        "weeks" => cmd_weeks(session, &inv.command_args, out),
        "years" => cmd_years(session, out),
        "labels" => cmd_labels(session, out),
        "check" => cmd_check(&inv.command_args, out),
        "export" => cmd_export(session, out),
        "_commands" => cmd_commands(out),
        "_show" => cmd_show(session.cfg, out),
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn parse_dates(args: &[String], today: CalendarDate) -> anyhow::Result<Vec<CalendarDate>> {
    if args.is_empty() {
        return Ok(vec![today]);
    }
    args.iter()
        .map(|arg| parse_date_expr(arg, today).with_context(|| format!("invalid date argument: {arg}")))
        .collect()
}

#[instrument(skip(session, args, out))]
fn cmd_week<R: LabelResolver>(
    session: &Session<'_, R>,
    args: &[String],
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    info!("command week");

    let rows: Vec<Classification> = parse_dates(args, session.today)?
        .into_iter()
        .map(|date| session.classifier.classify(date, session.locale))
        .collect();
    emit(session, &rows, out)
}

#[instrument(skip(session, args, out))]
fn cmd_cell<R: LabelResolver>(
    session: &Session<'_, R>,
    args: &[String],
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    info!("command cell");

    let grid_start = session.cfg.grid_week_start()?;
    debug!(%grid_start, "classifying grid cells");
    let rows: Vec<Classification> = parse_dates(args, session.today)?
        .into_iter()
        .map(|cell| {
            session
                .classifier
                .classify_grid_cell(cell, grid_start, session.locale)
        })
        .collect();
    emit(session, &rows, out)
}

#[instrument(skip(session, args, out))]
fn cmd_weeks<R: LabelResolver>(
    session: &Session<'_, R>,
    args: &[String],
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    info!("command weeks");

    let year = match args {
        [] => session.today.iso_week().year,
        [raw] => raw
            .trim()
            .parse::<i32>()
            .with_context(|| format!("invalid year: {raw}"))?,
        _ => return Err(anyhow!("weeks takes at most one year argument")),
    };

    if session.classifier.registry().get(year).is_none() {
        warn!(year, "no week table for year; every week is unclassified");
    }

    let rows = session.classifier.year_overview(year, session.locale);
    emit(session, &rows, out)
}

fn emit<R: LabelResolver>(
    session: &Session<'_, R>,
    rows: &[Classification],
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match OutputFormat::from_config(session.cfg)? {
        OutputFormat::Table => session.renderer.print_classifications(out, rows),
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string(rows)?)?;
            Ok(())
        }
    }
}

#[instrument(skip(session, out))]
fn cmd_years<R: LabelResolver>(session: &Session<'_, R>, out: &mut dyn Write) -> anyhow::Result<()> {
    info!("command years");

    let registry = session.classifier.registry();
    if registry.is_empty() {
        writeln!(out, "No week tables loaded.")?;
        return Ok(());
    }
    session.renderer.print_registry_summary(out, registry)
}

#[instrument(skip(session, out))]
fn cmd_labels<R: LabelResolver>(session: &Session<'_, R>, out: &mut dyn Write) -> anyhow::Result<()> {
    info!("command labels");

    let codes = [1, CODE_UNCLASSIFIED, CODE_EASTER, CODE_BREAK, CODE_BLOCUS];
    for locale in Locale::ALL {
        let labels: Vec<String> = codes
            .iter()
            .map(|&code| {
                format!(
                    "{code}={}",
                    session.classifier.label_for_code(code, locale)
                )
            })
            .collect();
        writeln!(out, "{locale}: {}", labels.join(" "))?;
    }
    Ok(())
}

#[instrument(skip(args, out))]
fn cmd_check(args: &[String], out: &mut dyn Write) -> anyhow::Result<()> {
    info!("command check");

    if args.is_empty() {
        return Err(anyhow!("check requires at least one tables file"));
    }

    let mut failures = 0_usize;
    for arg in args {
        match WeekTableRegistry::load(Path::new(arg)) {
            Ok(registry) => {
                let years: Vec<String> = registry.years().map(|y| y.to_string()).collect();
                writeln!(out, "{arg}: ok ({})", years.join(", "))?;
            }
            Err(err) => {
                failures += 1;
                writeln!(out, "{arg}: {:#}", anyhow::Error::from(err))?;
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{failures} tables file(s) failed validation"));
    }
    Ok(())
}

#[instrument(skip(session, out))]
fn cmd_export<R: LabelResolver>(session: &Session<'_, R>, out: &mut dyn Write) -> anyhow::Result<()> {
    info!("command export");

    let json = serde_json::to_string_pretty(session.classifier.registry())?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn cmd_commands(out: &mut dyn Write) -> anyhow::Result<()> {
    for command in known_command_names() {
        writeln!(out, "{command}")?;
    }
    Ok(())
}

fn cmd_show(cfg: &Config, out: &mut dyn Write) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        writeln!(out, "{k}={v}")?;
    }
    Ok(())
}

fn cmd_help(out: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: week [DATE...], cell [DATE...], weeks [YEAR], years, \
         labels, check FILE..., export, _show, _commands, version.\n\
         Dates: today, tomorrow, yesterday, monday..sunday, +Nd, -Nw, \
         YYYY-MM-DD, DD/MM/YYYY, YYYY-Www."
    )?;
    Ok(())
}
