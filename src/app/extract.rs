use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::app::duration::parse_duration;
use crate::app::location::resolve_location;
use crate::app::types::{EventRecord, Field};

/// Marker text standing in for an event page whose body had no report rows.
pub const BLANK_REPORT: &str = "Blank report";

/// Marker text standing in for an event page that could not be fetched.
pub const DOWNLOAD_FAILED: &str = "Unable to download report";

/// Raw texts matching any of these are failed downloads, not reports; the
/// record keeps the text for audit but every field stays unparsed.
const FAILURE_SENTINELS: [&str; 2] = ["blank report", "unable to download report"];

/// The report structure is encoded entirely as patterns over semi-structured
/// text. Keeping them in one table keeps each independently testable and
/// swappable without touching orchestration code.
///
/// Time patterns capture a label, an `M/D/YY[YY]` date token, hour, minute
/// and optional second.
const TIME_PATTERN_SUFFIX: &str =
    r"([0-3]?[0-9]/[0-3]?[0-9]/(?:[0-9]{2})?[0-9]{2})\s?(2[0-3]|[01]?[0-9]):([0-5]?[0-9]):?([0-5]?[0-9])?";

static RE_OCCURRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(Occurred\s?:\s?){TIME_PATTERN_SUFFIX}"))
        .expect("invalid regex: occurred time")
});

static RE_REPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(Reported\s?:\s?){TIME_PATTERN_SUFFIX}"))
        .expect("invalid regex: reported time")
});

static RE_ENTERED_AS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(Entered\sas\s?:\s?){TIME_PATTERN_SUFFIX}"))
        .expect("invalid regex: entered-as time")
});

static RE_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Location:\s?(.*?)\s*Shape").expect("invalid regex: location"));

static RE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Shape:\s?(.*?)\s*Duration").expect("invalid regex: shape"));

static RE_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration:\s?(.*)").expect("invalid regex: duration"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Occurred,
    Reported,
    EnteredAs,
}

impl TimeKind {
    fn regex(self) -> &'static Regex {
        match self {
            TimeKind::Occurred => &RE_OCCURRED,
            TimeKind::Reported => &RE_REPORTED,
            TimeKind::EnteredAs => &RE_ENTERED_AS,
        }
    }
}

/// Map one raw report to a full [`EventRecord`].
///
/// Field extractors run independently; one field failing to parse never
/// blocks the others. A pure function: the same text always yields the same
/// record.
pub fn extract_report(url: &str, raw_text: &str) -> EventRecord {
    if is_failed_report(raw_text) {
        return EventRecord {
            url: url.to_string(),
            occurred_time: Field::Unparsed,
            reported_time: Field::Unparsed,
            entered_as_time: Field::Unparsed,
            shape: Field::Unparsed,
            duration: Field::Unparsed,
            city: Field::Unparsed,
            state: Field::Unparsed,
            state_abbreviation: Field::Unparsed,
            country: Field::Unparsed,
            description: Field::Unparsed,
            raw_text: raw_text.to_string(),
            report_ok: false,
        };
    }

    let location = extract_location_fragment(raw_text)
        .map(|fragment| resolve_location(&fragment))
        .unwrap_or_default();

    EventRecord {
        url: url.to_string(),
        occurred_time: Field::from_option(extract_time(raw_text, TimeKind::Occurred)),
        reported_time: Field::from_option(extract_time(raw_text, TimeKind::Reported)),
        entered_as_time: Field::from_option(extract_time(raw_text, TimeKind::EnteredAs)),
        shape: Field::from_option(extract_shape(raw_text)),
        duration: Field::from_option(
            extract_duration_text(raw_text).and_then(|text| parse_duration(&text)),
        ),
        city: location.city,
        state: location.state,
        state_abbreviation: location.state_abbreviation,
        country: location.country,
        description: Field::Parsed(extract_description(raw_text)),
        raw_text: raw_text.to_string(),
        report_ok: true,
    }
}

pub fn is_failed_report(raw_text: &str) -> bool {
    let lower = raw_text.to_lowercase();
    FAILURE_SENTINELS
        .iter()
        .any(|sentinel| lower.contains(sentinel))
}

/// Reassemble a time match as `"<date> <H>:<M>[:<S>]"` and parse it. A
/// pattern miss or a failed reassembly both yield `None` rather than a
/// partially-built value.
pub fn extract_time(raw_text: &str, kind: TimeKind) -> Option<NaiveDateTime> {
    let captures = kind.regex().captures(raw_text)?;
    let date = captures.get(2)?.as_str();
    let hour = captures.get(3)?.as_str();
    let minute = captures.get(4)?.as_str();
    let timestamp = match captures.get(5) {
        Some(second) => format!("{date} {hour}:{minute}:{}", second.as_str()),
        None => format!("{date} {hour}:{minute}"),
    };
    parse_report_timestamp(&timestamp)
}

fn parse_report_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    // Two-digit-year formats go first: %Y would otherwise accept "19" as
    // the literal year 19.
    const FORMATS: [&str; 4] = [
        "%m/%d/%y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%y %H:%M",
        "%m/%d/%Y %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
}

/// Text strictly between the `Shape:` and `Duration` labels, lowercased.
pub fn extract_shape(raw_text: &str) -> Option<String> {
    let captures = RE_SHAPE.captures(raw_text)?;
    let shape = captures.get(1)?.as_str().trim().to_lowercase();
    if shape.is_empty() { None } else { Some(shape) }
}

/// Text strictly between the `Location:` and `Shape` labels.
pub fn extract_location_fragment(raw_text: &str) -> Option<String> {
    let captures = RE_LOCATION.captures(raw_text)?;
    let fragment = captures.get(1)?.as_str().trim();
    if fragment.is_empty() {
        None
    } else {
        Some(fragment.to_string())
    }
}

/// Text after the `Duration:` label, up to end of line.
pub fn extract_duration_text(raw_text: &str) -> Option<String> {
    let captures = RE_DURATION.captures(raw_text)?;
    Some(captures.get(1)?.as_str().trim().to_string())
}

/// Everything from the third line onward; the first two lines are URL and
/// table-header noise. An empty description is still a valid description.
pub fn extract_description(raw_text: &str) -> String {
    raw_text
        .lines()
        .skip(2)
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string()
}
