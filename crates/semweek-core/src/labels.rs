use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::{
    debug,
    warn,
};

use crate::config::Config;
use crate::table::WeekKind;

/// UI language of the calendar surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    En,
    #[default]
    Fr,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Fr];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    /// Accepts bare language codes and tagged forms such as `en-GB` or
    /// `fr_BE`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            _ => Err(anyhow!("unsupported locale: {s} (expected EN or FR)")),
        }
    }
}

/// Turns a week kind into the text shown in a calendar cell.
pub trait LabelResolver: Send + Sync {
    fn label(&self, locale: Locale, kind: WeekKind) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BreakLabels {
    easter: String,
    break_: String,
    blocus: String,
}

/// Built-in English and French labels.
///
/// Teaching weeks always render as `S{n}` and unclassified weeks as `-`.
/// The three break labels can be overridden per locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    en: BreakLabels,
    fr: BreakLabels,
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self {
            en: BreakLabels {
                easter: "Easter".to_string(),
                break_: "Break".to_string(),
                blocus: "Blocus".to_string(),
            },
            fr: BreakLabels {
                easter: "Pâques".to_string(),
                break_: "Congé".to_string(),
                blocus: "Blocus".to_string(),
            },
        }
    }
}

impl LabelCatalog {
    /// Default catalog with `label.<locale>.<kind>` overrides applied.
    #[tracing::instrument(skip_all)]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mut catalog = Self::default();
        for (key, value) in cfg.iter() {
            let Some(rest) = key.strip_prefix("label.") else {
                continue;
            };
            let (locale, kind) = rest
                .split_once('.')
                .ok_or_else(|| anyhow!("invalid label key {key}: expected label.<locale>.<kind>"))?;
            let locale: Locale = locale.parse()?;
            catalog.set(locale, kind, value.clone())?;
            debug!(%locale, kind, value = %value, "label override");
        }
        Ok(catalog)
    }

    /// Overrides one break label. `kind` is `easter`, `break` or `blocus`.
    pub fn set(&mut self, locale: Locale, kind: &str, text: String) -> anyhow::Result<()> {
        if text.trim().is_empty() {
            warn!(%locale, kind, "empty label override");
        }
        let labels = self.labels_mut(locale);
        match kind {
            "easter" => labels.easter = text,
            "break" => labels.break_ = text,
            "blocus" => labels.blocus = text,
            other => return Err(anyhow!("unknown label kind: {other}")),
        }
        Ok(())
    }

    fn labels(&self, locale: Locale) -> &BreakLabels {
        match locale {
            Locale::En => &self.en,
            Locale::Fr => &self.fr,
        }
    }

    fn labels_mut(&mut self, locale: Locale) -> &mut BreakLabels {
        match locale {
            Locale::En => &mut self.en,
            Locale::Fr => &mut self.fr,
        }
    }
}

impl LabelResolver for LabelCatalog {
    fn label(&self, locale: Locale, kind: WeekKind) -> String {
        let labels = self.labels(locale);
        match kind {
            WeekKind::Teaching(n) => format!("S{n}"),
            WeekKind::Easter => labels.easter.clone(),
            WeekKind::Break => labels.break_.clone(),
            WeekKind::Blocus => labels.blocus.clone(),
            WeekKind::Unclassified => "-".to_string(),
        }
    }
}
