//! Date values.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Which parts of a date value are meaningful.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DateKind {
    Date,
    Time,
    DateTime,
}

/// An instant tagged with the parts a template should show.
///
/// Stored in UTC; rendered in the render's time zone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DateValue {
    instant: DateTime<Utc>,
    kind: DateKind,
}

impl DateValue {
    pub fn new(instant: DateTime<Utc>, kind: DateKind) -> Self {
        DateValue { instant, kind }
    }

    pub fn date_time(instant: DateTime<Utc>) -> Self {
        Self::new(instant, DateKind::DateTime)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn kind(&self) -> DateKind {
        self.kind
    }

    /// Same instant, different displayed parts (`?date`, `?time`, `?datetime`).
    #[must_use]
    pub fn with_kind(self, kind: DateKind) -> Self {
        DateValue { kind, ..self }
    }

    /// Default rendering: `2024-03-01`, `13:45:00` or `2024-03-01 13:45:00`.
    pub fn render(&self, tz: Tz) -> String {
        let pattern = match self.kind {
            DateKind::Date => "%Y-%m-%d",
            DateKind::Time => "%H:%M:%S",
            DateKind::DateTime => "%Y-%m-%d %H:%M:%S",
        };
        self.instant.with_timezone(&tz).format(pattern).to_string()
    }

    /// ISO 8601 with the zone offset (`?iso`).
    pub fn iso(&self, tz: Tz) -> String {
        let local = self.instant.with_timezone(&tz);
        match self.kind {
            DateKind::Date => local.format("%Y-%m-%d").to_string(),
            DateKind::Time => local.format("%H:%M:%S%:z").to_string(),
            DateKind::DateTime => local.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        }
    }

    /// Spelled-out form (`?long`): `Friday, March 1, 2024 13:45:00 CET`.
    pub fn long(&self, tz: Tz) -> String {
        let pattern = match self.kind {
            DateKind::Date => "%A, %B %-d, %Y",
            DateKind::Time => "%H:%M:%S %Z",
            DateKind::DateTime => "%A, %B %-d, %Y %H:%M:%S %Z",
        };
        self.instant.with_timezone(&tz).format(pattern).to_string()
    }

    /// Render with a caller-supplied `strftime` pattern.
    ///
    /// Returns `None` when the pattern contains an unknown specifier.
    pub fn format_with(&self, pattern: &str, tz: Tz) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", self.instant.with_timezone(&tz).format(pattern)).ok()?;
        Some(out)
    }
}
