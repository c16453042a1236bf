//! Week-number badges for calendar cells.
//!
//! [`AcademicWeekClassifier`] maps a date to its ISO week and to the
//! institutional meaning of that week (teaching week `S{n}`, Easter,
//! break, blocus or unclassified). It never fails: a year with no table
//! or a week past the end of a table both come back unclassified, so a
//! calendar keeps rendering when institutional data is missing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use tracing::debug;

use crate::datetime::{
    CalendarDate,
    weeks_in_iso_year,
};
use crate::labels::{
    LabelCatalog,
    LabelResolver,
    Locale,
};
use crate::registry::WeekTableRegistry;
use crate::table::{
    CODE_UNCLASSIFIED,
    WeekKind,
};

/// First weekday column of a rendered calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridWeekStart {
    Monday,
    #[default]
    Sunday,
}

impl GridWeekStart {
    /// The date whose ISO week labels a grid row starting at `cell`.
    ///
    /// A Sunday-first row begins the day before the ISO week it mostly
    /// shows, so its cell is moved forward one day.
    pub fn iso_anchor(self, cell: CalendarDate) -> CalendarDate {
        match self {
            Self::Monday => cell,
            Self::Sunday => cell.add_days(1).unwrap_or(cell),
        }
    }
}

impl FromStr for GridWeekStart {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Self::Monday),
            "sunday" | "sun" => Ok(Self::Sunday),
            other => Err(anyhow!("invalid grid week start: {other} (expected monday or sunday)")),
        }
    }
}

impl fmt::Display for GridWeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monday => f.write_str("monday"),
            Self::Sunday => f.write_str("sunday"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub date: CalendarDate,
    /// Year of the week's Thursday; also the registry key.
    pub iso_year: i32,
    pub week_number: u32,
    pub code: i32,
    #[serde(skip)]
    pub kind: WeekKind,
    pub label: String,
}

pub struct AcademicWeekClassifier<R = LabelCatalog> {
    registry: Arc<WeekTableRegistry>,
    labels: R,
}

impl AcademicWeekClassifier<LabelCatalog> {
    #[must_use]
    pub fn with_default_labels(registry: Arc<WeekTableRegistry>) -> Self {
        Self::new(registry, LabelCatalog::default())
    }
}

impl<R: LabelResolver> AcademicWeekClassifier<R> {
    pub fn new(registry: Arc<WeekTableRegistry>, labels: R) -> Self {
        Self { registry, labels }
    }

    #[must_use]
    pub fn registry(&self) -> &WeekTableRegistry {
        &self.registry
    }

    /// Table code of the ISO week containing `date`.
    #[must_use]
    pub fn code_for(&self, date: CalendarDate) -> i32 {
        let iso = date.iso_week();
        match self.registry.get(iso.year) {
            Some(table) => {
                if iso.week as usize > table.len() {
                    debug!(year = iso.year, week = iso.week, len = table.len(), "week past end of table");
                }
                table.code_for_week(iso.week)
            }
            None => {
                debug!(year = iso.year, "no week table for year");
                CODE_UNCLASSIFIED
            }
        }
    }

    pub fn classify(&self, date: CalendarDate, locale: Locale) -> Classification {
        let iso = date.iso_week();
        let code = self.code_for(date);
        let kind = WeekKind::from_code(code);
        Classification {
            date,
            iso_year: iso.year,
            week_number: iso.week,
            code,
            kind,
            label: self.labels.label(locale, kind),
        }
    }

    /// Classifies a grid cell, applying the Sunday-first shift.
    pub fn classify_grid_cell(
        &self,
        cell: CalendarDate,
        grid_start: GridWeekStart,
        locale: Locale,
    ) -> Classification {
        self.classify(grid_start.iso_anchor(cell), locale)
    }

    #[must_use]
    pub fn label_for_code(&self, code: i32, locale: Locale) -> String {
        self.labels.label(locale, WeekKind::from_code(code))
    }

    /// One classification per ISO week of `year`, each anchored on the
    /// week's Monday.
    pub fn year_overview(&self, year: i32, locale: Locale) -> Vec<Classification> {
        (1..=weeks_in_iso_year(year))
            .filter_map(|week| CalendarDate::from_iso_week(year, week).ok())
            .map(|monday| self.classify(monday, locale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        CalendarDate::from_ymd(y, m, d).expect("valid date")
    }

    fn classifier() -> AcademicWeekClassifier {
        let registry = WeekTableRegistry::builtin().expect("builtin tables");
        AcademicWeekClassifier::with_default_labels(Arc::new(registry))
    }

    #[test]
    fn scenario_2022_break_then_first_week() {
        let c = classifier();

        // 2022-01-24 is a Monday in ISO week 4.
        let week4 = c.classify(date(2022, 1, 24), Locale::En);
        assert_eq!(week4.week_number, 4);
        assert_eq!(week4.code, -2);
        assert_eq!(week4.label, "Break");
        assert_eq!(c.classify(date(2022, 1, 24), Locale::Fr).label, "Congé");

        let week5 = c.classify(date(2022, 2, 3), Locale::Fr);
        assert_eq!(week5.week_number, 5);
        assert_eq!(week5.code, 1);
        assert_eq!(week5.label, "S1");
    }

    #[test]
    fn missing_year_is_unclassified() {
        let c = classifier();
        let out = c.classify(date(2031, 3, 12), Locale::En);
        assert_eq!(out.code, 0);
        assert_eq!(out.kind, WeekKind::Unclassified);
        assert_eq!(out.label, "-");
    }

    #[test]
    fn week_past_table_end_is_unclassified() {
        // 2021-01-01 falls in ISO week 2020-W53.
        let registry = WeekTableRegistry::from_json_str(r#"{ "2020": [1, 2, 3] }"#)
            .expect("tables");
        let c = AcademicWeekClassifier::with_default_labels(Arc::new(registry));
        let out = c.classify(date(2021, 1, 1), Locale::En);
        assert_eq!((out.iso_year, out.week_number), (2020, 53));
        assert_eq!(out.code, 0);
        assert_eq!(out.label, "-");
    }

    #[test]
    fn registry_is_keyed_by_thursday_year() {
        let c = classifier();
        // Monday 2024-12-30 belongs to 2025-W01; no 2025 table exists.
        let out = c.classify(date(2024, 12, 30), Locale::En);
        assert_eq!(out.iso_year, 2025);
        assert_eq!(out.label, "-");

        // Sunday 2023-01-01 belongs to 2022-W52, the last 2022 entry.
        let out = c.classify(date(2023, 1, 1), Locale::En);
        assert_eq!((out.iso_year, out.week_number), (2022, 52));
        assert_eq!(out.label, "Blocus");
    }

    #[test]
    fn classification_is_deterministic() {
        let c = classifier();
        let day = date(2023, 4, 12);
        assert_eq!(c.classify(day, Locale::Fr), c.classify(day, Locale::Fr));
    }

    #[test]
    fn labels_for_raw_codes() {
        let c = classifier();
        assert_eq!(c.label_for_code(7, Locale::En), "S7");
        assert_eq!(c.label_for_code(-1, Locale::Fr), "Pâques");
        assert_eq!(c.label_for_code(-1, Locale::En), "Easter");
        assert_eq!(c.label_for_code(-3, Locale::Fr), "Blocus");
        assert_eq!(c.label_for_code(-3, Locale::En), "Blocus");
        assert_eq!(c.label_for_code(0, Locale::En), "-");
        assert_eq!(c.label_for_code(-42, Locale::Fr), "-");
    }

    #[test]
    fn sunday_grid_cell_takes_following_week() {
        let c = classifier();
        // Sunday 2022-01-30 heads the grid row for ISO week 5.
        let sunday = date(2022, 1, 30);
        let as_iso = c.classify(sunday, Locale::En);
        let as_cell = c.classify_grid_cell(sunday, GridWeekStart::Sunday, Locale::En);
        assert_eq!(as_iso.week_number, 4);
        assert_eq!(as_cell.week_number, 5);
        assert_eq!(as_cell.label, "S1");

        let monday = date(2022, 1, 31);
        let monday_cell = c.classify_grid_cell(monday, GridWeekStart::Monday, Locale::En);
        assert_eq!(monday_cell.week_number, 5);
    }

    #[test]
    fn year_overview_has_one_row_per_iso_week() {
        let c = classifier();
        let rows = c.year_overview(2020, Locale::En);
        assert_eq!(rows.len(), 53);
        assert_eq!(rows[0].date, date(2019, 12, 30));
        assert_eq!(rows[0].label, "Blocus");
        assert_eq!(rows[14].label, "Easter");
        assert!(rows.iter().all(|row| row.iso_year == 2020));
    }
}
