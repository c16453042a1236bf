use std::fmt;
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::{
  Serialize,
  Serializer
};

use crate::config::Config;
use crate::error::InvalidDateError;

const TIMEZONE_ENV_VAR: &str =
  "SEMWEEK_TIMEZONE";
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A civil date, read in UTC for week
/// numbering.
///
/// Only years `1..=9999` are accepted,
/// so shifting to the Thursday of a week
/// never leaves the representable range.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash
)]
pub struct CalendarDate(NaiveDate);

/// An ISO-8601 week: the Thursday's
/// year and the 1-based week number.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash
)]
pub struct IsoWeek {
  pub year: i32,
  pub week: u32
}

impl fmt::Display for IsoWeek {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-W{:02}",
      self.year, self.week
    )
  }
}

impl CalendarDate {
  pub fn from_ymd(
    year: i32,
    month: u32,
    day: u32
  ) -> Result<Self, InvalidDateError> {
    if !(1..=12).contains(&month) {
      return Err(
        InvalidDateError::Month {
          month
        }
      );
    }
    if !(MIN_YEAR..=MAX_YEAR)
      .contains(&year)
    {
      return Err(
        InvalidDateError::OutOfRange
      );
    }
    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .map(Self)
    .ok_or(InvalidDateError::Day {
      year,
      month,
      day
    })
  }

  pub fn from_naive(
    date: NaiveDate
  ) -> Result<Self, InvalidDateError> {
    if !(MIN_YEAR..=MAX_YEAR)
      .contains(&date.year())
    {
      return Err(
        InvalidDateError::OutOfRange
      );
    }
    Ok(Self(date))
  }

  /// Monday of ISO week `week` of ISO
  /// year `year`.
  pub fn from_iso_week(
    year: i32,
    week: u32
  ) -> Result<Self, InvalidDateError> {
    let monday =
      NaiveDate::from_isoywd_opt(
        year,
        week,
        Weekday::Mon
      )
      .ok_or(InvalidDateError::IsoWeek {
        year,
        week
      })?;
    Self::from_naive(monday)
  }

  #[must_use]
  pub fn naive(&self) -> NaiveDate {
    self.0
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.0.year()
  }

  #[must_use]
  pub fn month(&self) -> u32 {
    self.0.month()
  }

  #[must_use]
  pub fn day(&self) -> u32 {
    self.0.day()
  }

  #[must_use]
  pub fn weekday(&self) -> Weekday {
    self.0.weekday()
  }

  pub fn add_days(
    &self,
    days: i64
  ) -> Result<Self, InvalidDateError> {
    let delta = Duration::try_days(days)
      .ok_or(
        InvalidDateError::OutOfRange
      )?;
    let shifted = self
      .0
      .checked_add_signed(delta)
      .ok_or(
        InvalidDateError::OutOfRange
      )?;
    Self::from_naive(shifted)
  }

  /// Thursday of the Monday-first week
  /// containing this date.
  #[must_use]
  pub fn thursday(&self) -> NaiveDate {
    let dow = i64::from(
      self.0.weekday().number_from_monday()
    );
    self.0 + Duration::days(4 - dow)
  }

  /// ISO week by the nearest-Thursday
  /// rule: whole weeks from January 1
  /// of the Thursday's year to the
  /// Thursday, rounded up.
  #[must_use]
  pub fn iso_week(&self) -> IsoWeek {
    let thursday = self.thursday();
    let days_from_year_start =
      thursday.ordinal0();
    IsoWeek {
      year: thursday.year(),
      week: (days_from_year_start + 1)
        .div_ceil(7)
    }
  }
}

impl fmt::Display for CalendarDate {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.0.format("%Y-%m-%d")
    )
  }
}

impl FromStr for CalendarDate {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let date = NaiveDate::parse_from_str(
      s.trim(),
      "%Y-%m-%d"
    )
    .with_context(|| {
      format!(
        "invalid date {s:?} (expected \
         YYYY-MM-DD)"
      )
    })?;
    Ok(Self::from_naive(date)?)
  }
}

impl Serialize for CalendarDate {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.collect_str(self)
  }
}

/// ISO week number (1-53) of `date`.
///
/// The number belongs to the year of
/// the week's Thursday, which is not
/// always `date.year()`; use
/// [`CalendarDate::iso_week`] when that
/// year matters.
#[must_use]
pub fn iso_week_number(
  date: CalendarDate
) -> u32 {
  date.iso_week().week
}

/// Number of ISO weeks (52 or 53) in
/// ISO year `year`.
#[must_use]
pub fn weeks_in_iso_year(
  year: i32
) -> u32 {
  NaiveDate::from_ymd_opt(year, 12, 28)
    .map(|dec28| dec28.iso_week().week())
    .unwrap_or(52)
}

/// Time zone used to decide what
/// "today" is. `SEMWEEK_TIMEZONE` wins
/// over the `timezone` config key; an
/// unparsable zone falls back to UTC.
#[tracing::instrument(skip(cfg))]
pub fn resolve_timezone(
  cfg: &Config
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = cfg.get("timezone")
    && let Some(tz) =
      parse_timezone(&raw, "config")
  {
    return tz;
  }

  tracing::warn!(
    "no usable timezone configured; \
     using UTC"
  );
  chrono_tz::UTC
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// The civil date of `now` in `tz`.
pub fn today_in(
  tz: &Tz,
  now: DateTime<Utc>
) -> anyhow::Result<CalendarDate> {
  Ok(CalendarDate::from_naive(
    now.with_timezone(tz).date_naive()
  )?)
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: CalendarDate
) -> anyhow::Result<CalendarDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(today.add_days(1)?);
    }
    | "yesterday" => {
      return Ok(today.add_days(-1)?);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    )?);
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let days = match unit {
      | "d" => num,
      | "w" => num.saturating_mul(7),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return Ok(today.add_days(
      if sign == "-" {
        -days
      } else {
        days
      }
    )?);
  }

  let week_re = Regex::new(r"^(?P<year>\d{4})-w(?P<week>\d{1,2})$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    week_re.captures(&lower)
  {
    let year: i32 = caps["year"]
      .parse()
      .context("invalid ISO year")?;
    let week: u32 = caps["week"]
      .parse()
      .context("invalid ISO week")?;
    return Ok(
      CalendarDate::from_iso_week(
        year, week
      )?
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(
      CalendarDate::from_naive(date)?
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%d/%m/%Y"
    )
  {
    return Ok(
      CalendarDate::from_naive(date)?
    );
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD, \
     DD/MM/YYYY, YYYY-Www"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: CalendarDate,
  target: Weekday
) -> Result<CalendarDate, InvalidDateError>
{
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from.add_days(delta)
}
