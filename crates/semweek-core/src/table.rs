use serde::Serialize;

use crate::error::TableError;

/// Highest ISO week number a year can have.
pub const MAX_ISO_WEEKS: usize = 53;

pub const CODE_UNCLASSIFIED: i32 = 0;
pub const CODE_EASTER: i32 = -1;
pub const CODE_BREAK: i32 = -2;
pub const CODE_BLOCUS: i32 = -3;

/// Semantic meaning of a week code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekKind {
    /// Regular teaching week, carrying its index within the semester.
    Teaching(u32),
    Unclassified,
    Easter,
    Break,
    /// Exam and revision period.
    Blocus,
}

impl WeekKind {
    /// Decodes a raw table code. Unknown negative codes are unclassified.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            n if n > 0 => Self::Teaching(n.unsigned_abs()),
            CODE_EASTER => Self::Easter,
            CODE_BREAK => Self::Break,
            CODE_BLOCUS => Self::Blocus,
            _ => Self::Unclassified,
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Teaching(n) => i32::try_from(n).unwrap_or(i32::MAX),
            Self::Unclassified => CODE_UNCLASSIFIED,
            Self::Easter => CODE_EASTER,
            Self::Break => CODE_BREAK,
            Self::Blocus => CODE_BLOCUS,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Teaching(_) => "teaching",
            Self::Unclassified => "unclassified",
            Self::Easter => "easter",
            Self::Break => "break",
            Self::Blocus => "blocus",
        }
    }
}

/// Per-year week codes, indexed by `iso_week - 1`.
///
/// Built through [`WeekClassificationTable::new`], which rejects tables
/// longer than 53 weeks and codes outside `-3..=53`. Reads past the end
/// of a shorter table yield [`CODE_UNCLASSIFIED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekClassificationTable {
    codes: Vec<i32>,
}

impl WeekClassificationTable {
    pub fn new(year: i32, raw: &[i64]) -> Result<Self, TableError> {
        if raw.is_empty() || raw.len() > MAX_ISO_WEEKS {
            return Err(TableError::InvalidLength {
                year,
                len: raw.len(),
            });
        }

        let mut codes = Vec::with_capacity(raw.len());
        for (idx, &code) in raw.iter().enumerate() {
            if !(i64::from(CODE_BLOCUS)..=MAX_ISO_WEEKS as i64).contains(&code) {
                return Err(TableError::InvalidCode {
                    year,
                    week: idx + 1,
                    code,
                });
            }
            codes.push(code as i32);
        }

        Ok(Self { codes })
    }

    /// Code for a 1-based ISO week, or `0` when the week is not covered.
    #[must_use]
    pub fn code_for_week(&self, week: u32) -> i32 {
        let Some(idx) = (week as usize).checked_sub(1) else {
            return CODE_UNCLASSIFIED;
        };
        self.codes.get(idx).copied().unwrap_or(CODE_UNCLASSIFIED)
    }

    #[must_use]
    pub fn kind_for_week(&self, week: u32) -> WeekKind {
        WeekKind::from_code(self.code_for_week(week))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    /// Number of regular teaching weeks over the whole table.
    #[must_use]
    pub fn teaching_weeks(&self) -> usize {
        self.codes.iter().filter(|&&code| code > 0).count()
    }
}
