use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use clap::{Parser, ValueEnum};
use thiserror::Error;
use url::Url;

use crate::app::fetch::FetchError;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "nuforc-scrape",
    version,
    about = "Scrape NUFORC UFO sighting reports into CSV/JSON"
)]
pub struct Cli {
    /// Scrape every known month, or only months inside --from/--to.
    #[arg(long, value_enum, default_value_t = ScrapeModeArg::Full)]
    pub mode: ScrapeModeArg,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub from: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub to: Option<NaiveDate>,

    #[arg(long, value_name = "N", default_value_t = 10)]
    pub retries: usize,

    #[arg(long, value_name = "N", default_value_t = 32)]
    pub concurrency: usize,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Csv)]
    pub format: FileFormatArg,

    /// Report index root; override to scrape a mirror.
    #[arg(long, value_name = "URL", default_value = crate::app::index::DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum ScrapeModeArg {
    Full,
    Timespan,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum FileFormatArg {
    Csv,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Json => DataFormat::Json,
        }
    }
}

/// Per-field extraction result. The upstream reports are free text scraped
/// out of third-party HTML, so any single field may fail to parse without
/// invalidating the rest of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<T> {
    Parsed(T),
    Unparsed,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unparsed
    }
}

impl<T> Field<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Parsed(v),
            None => Field::Unparsed,
        }
    }

    pub fn as_parsed(&self) -> Option<&T> {
        match self {
            Field::Parsed(v) => Some(v),
            Field::Unparsed => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Field::Parsed(_))
    }
}

impl<T: fmt::Display> Field<T> {
    /// String form used by the CSV/JSON sinks: the value, or the literal
    /// `unparsed` marker so every column is always populated.
    pub fn render(&self) -> String {
        match self {
            Field::Parsed(v) => v.to_string(),
            Field::Unparsed => "unparsed".to_string(),
        }
    }
}

/// A single event link from a month page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReference {
    pub date: NaiveDateTime,
    pub url: Url,
}

/// Final output unit. Built once per scraped event and immutable after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub url: String,
    pub occurred_time: Field<NaiveDateTime>,
    pub reported_time: Field<NaiveDateTime>,
    pub entered_as_time: Field<NaiveDateTime>,
    pub shape: Field<String>,
    pub duration: Field<TimeDelta>,
    pub city: Field<String>,
    pub state: Field<String>,
    pub state_abbreviation: Field<String>,
    pub country: Field<String>,
    pub description: Field<String>,
    pub raw_text: String,
    pub report_ok: bool,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid timespan: start {start} is after end {end}")]
    TimespanOrder { start: NaiveDate, end: NaiveDate },

    #[error("timespan mode requires both --from and --to")]
    TimespanBounds,

    #[error("invalid base url {url}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("month index at {url} unreachable: {source}")]
    RootIndex {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("month index at {url} returned http {status}")]
    RootIndexStatus { url: String, status: u16 },

    #[error("month index at {url} contained no month links")]
    EmptyIndex { url: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_renders_value_or_marker() {
        assert_eq!(Field::Parsed(5).render(), "5");
        assert_eq!(Field::<i32>::Unparsed.render(), "unparsed");
    }

    #[test]
    fn field_from_option() {
        assert_eq!(Field::from_option(Some("x")), Field::Parsed("x"));
        assert_eq!(Field::<&str>::from_option(None), Field::Unparsed);
        assert!(!Field::<&str>::Unparsed.is_parsed());
    }
}
