//! Year-keyed week classification tables.
//!
//! Keys are ISO week-numbering years: the calendar year of the Thursday
//! of a week. Entry `w - 1` of the table keyed `Y` classifies ISO week
//! `Y-Www`, so a table written for `2019` covers the January-May
//! semester of the 2018-2019 academic year and the September-December
//! semester of 2019-2020.
//!
//! Tables files are a single object mapping year strings to code arrays,
//! either JSON (`{ "2019": [0, 0, -2, 1, ...] }`) or TOML
//! (`"2019" = [0, 0, -2, 1, ...]`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{
    debug,
    info,
};

use crate::error::TableError;
use crate::table::WeekClassificationTable;

const BUILTIN_TABLES: &str = include_str!("../data/weeks.json");

type RawTables = BTreeMap<String, Vec<i64>>;

/// Immutable mapping from ISO year to its week table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekTableRegistry {
    tables: BTreeMap<i32, WeekClassificationTable>,
}

impl WeekTableRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables shipped with the crate (2019 through 2024).
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_json_str(BUILTIN_TABLES)
    }

    #[tracing::instrument(skip_all)]
    pub fn from_json_str(text: &str) -> Result<Self, TableError> {
        let raw: RawTables = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    #[tracing::instrument(skip_all)]
    pub fn from_toml_str(text: &str) -> Result<Self, TableError> {
        let raw: RawTables = toml::from_str(text)?;
        Self::from_raw(raw)
    }

    /// Loads a tables file; `.toml` files are read as TOML, anything
    /// else as JSON.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let registry = if is_toml {
            Self::from_toml_str(&text)?
        } else {
            Self::from_json_str(&text)?
        };

        info!(
            path = %path.display(),
            years = registry.len(),
            "loaded week tables"
        );
        Ok(registry)
    }

    fn from_raw(raw: RawTables) -> Result<Self, TableError> {
        let mut tables = BTreeMap::new();
        for (key, codes) in raw {
            let year: i32 = key
                .trim()
                .parse()
                .map_err(|_| TableError::InvalidYear { key: key.clone() })?;
            if tables.contains_key(&year) {
                return Err(TableError::DuplicateYear { year, key });
            }
            let table = WeekClassificationTable::new(year, &codes)?;
            debug!(year, weeks = table.len(), "validated week table");
            tables.insert(year, table);
        }
        Ok(Self { tables })
    }

    /// Returns a copy with `year` set to `table`.
    #[must_use]
    pub fn with_table(mut self, year: i32, table: WeekClassificationTable) -> Self {
        self.tables.insert(year, table);
        self
    }

    #[must_use]
    pub fn get(&self, year: i32) -> Option<&WeekClassificationTable> {
        self.tables.get(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.tables.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &WeekClassificationTable)> {
        self.tables.iter().map(|(year, table)| (*year, table))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A registry that can be swapped while readers hold snapshots.
///
/// Every update replaces the whole map; a snapshot taken before the
/// update keeps seeing the old tables.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<WeekTableRegistry>>>,
}

impl SharedRegistry {
    #[must_use]
    pub fn new(registry: WeekTableRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<WeekTableRegistry> {
        let guard = self.current.read();
        Arc::clone(&guard)
    }

    pub fn replace(&self, registry: WeekTableRegistry) {
        let mut guard = self.current.write();
        info!(years = registry.len(), "replaced week tables");
        *guard = Arc::new(registry);
    }

    /// Swaps in a copy of the current registry with one year replaced.
    pub fn replace_year(&self, year: i32, table: WeekClassificationTable) {
        let mut guard = self.current.write();
        let next = (**guard).clone().with_table(year, table);
        debug!(year, "replaced week table for year");
        *guard = Arc::new(next);
    }
}
