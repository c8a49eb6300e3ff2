use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;

/// One `{quantity} {unit}` phrase inside a duration description. Quantities
/// may be numeric (possibly fractional) or a small written-out number.
static RE_INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            (?P<number>\d+(?:[.,]\d+)?)
            |
            (?P<word>an?|one|two|three|four|five|six|seven|eight|nine|ten|couple)
        )
        \s*(?:of\s+)?
        (?P<unit>seconds?|secs?|s\b|minutes?|mins?|m\b|hours?|hrs?|h\b|days?)
        ",
    )
    .expect("invalid regex: interval")
});

/// Normalize a raw duration string before interval parsing:
/// lowercase/trim, keep only the segment after the first hyphen (ranges
/// like `2 - 5 minutes` mean the endpoint), strip `+` and `:`, and fix the
/// recurring source misspellings.
pub fn clean_time_string(raw: &str) -> String {
    let mut text = raw.to_lowercase().trim().to_string();
    if let Some((_, rest)) = text.split_once('-') {
        text = rest.to_string();
    }
    text.retain(|ch| ch != '+' && ch != ':');
    text = text.replace("mintues", "minutes");
    text = text.replace("hrs", "hours");
    text.trim().to_string()
}

/// Parse a free-text duration like `5 minutes`, `about 1-2 hrs` or
/// `one minute 30 seconds` into a [`TimeDelta`]. Returns `None` when no
/// interval phrase is recognized; never an error.
pub fn parse_duration(raw: &str) -> Option<TimeDelta> {
    let mut text = clean_time_string(raw);
    if text.is_empty() {
        return None;
    }
    // "half an hour" reads as quantity 0.5, not as the article "an".
    for pattern in ["half an ", "half a ", "half "] {
        if text.contains(pattern) {
            text = text.replace(pattern, "0.5 ");
        }
    }

    let mut total_seconds = 0f64;
    let mut recognized = false;
    for captures in RE_INTERVAL.captures_iter(&text) {
        let quantity = if let Some(number) = captures.name("number") {
            number.as_str().replace(',', ".").parse::<f64>().ok()?
        } else {
            match captures.name("word")?.as_str() {
                "a" | "an" | "one" => 1.0,
                "two" | "couple" => 2.0,
                "three" => 3.0,
                "four" => 4.0,
                "five" => 5.0,
                "six" => 6.0,
                "seven" => 7.0,
                "eight" => 8.0,
                "nine" => 9.0,
                "ten" => 10.0,
                _ => continue,
            }
        };
        let unit_seconds = match captures.name("unit")?.as_str() {
            unit if unit.starts_with('s') => 1.0,
            unit if unit.starts_with('m') => 60.0,
            unit if unit.starts_with('h') => 3_600.0,
            _ => 86_400.0,
        };
        total_seconds += quantity * unit_seconds;
        recognized = true;
    }

    if !recognized {
        return None;
    }
    TimeDelta::try_seconds(total_seconds.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_lowercases_and_trims() {
        assert_eq!(clean_time_string("  5 Minutes "), "5 minutes");
    }

    #[test]
    fn clean_keeps_range_endpoint() {
        assert_eq!(clean_time_string("2 - 5 minutes"), "5 minutes");
        assert_eq!(clean_time_string("1-2 hrs"), "2 hours");
    }

    #[test]
    fn clean_strips_plus_and_colon() {
        assert_eq!(clean_time_string("10+ minutes"), "10 minutes");
        assert_eq!(clean_time_string("00:30"), "0030");
    }

    #[test]
    fn clean_fixes_misspellings() {
        assert_eq!(clean_time_string("5 mintues"), "5 minutes");
        assert_eq!(clean_time_string("2 hrs"), "2 hours");
    }

    #[test]
    fn parses_simple_intervals() {
        assert_eq!(parse_duration("5 minutes"), Some(TimeDelta::minutes(5)));
        assert_eq!(parse_duration("30 seconds"), Some(TimeDelta::seconds(30)));
        assert_eq!(parse_duration("2 hours"), Some(TimeDelta::hours(2)));
        assert_eq!(parse_duration("3 days"), Some(TimeDelta::days(3)));
    }

    #[test]
    fn parses_abbreviated_units() {
        assert_eq!(parse_duration("45 secs"), Some(TimeDelta::seconds(45)));
        assert_eq!(parse_duration("10 min"), Some(TimeDelta::minutes(10)));
        assert_eq!(parse_duration("1 hr"), Some(TimeDelta::hours(1)));
    }

    #[test]
    fn parses_written_numbers() {
        assert_eq!(parse_duration("one minute"), Some(TimeDelta::minutes(1)));
        assert_eq!(parse_duration("an hour"), Some(TimeDelta::hours(1)));
        assert_eq!(
            parse_duration("half an hour"),
            Some(TimeDelta::seconds(1_800))
        );
        assert_eq!(
            parse_duration("a couple of minutes"),
            Some(TimeDelta::minutes(2))
        );
    }

    #[test]
    fn sums_compound_phrases() {
        assert_eq!(
            parse_duration("1 hour 30 minutes"),
            Some(TimeDelta::minutes(90))
        );
        assert_eq!(
            parse_duration("one minute 30 seconds"),
            Some(TimeDelta::seconds(90))
        );
    }

    #[test]
    fn fractional_quantities() {
        assert_eq!(parse_duration("1.5 hours"), Some(TimeDelta::minutes(90)));
        assert_eq!(parse_duration("2,5 minutes"), Some(TimeDelta::seconds(150)));
    }

    #[test]
    fn range_takes_endpoint() {
        assert_eq!(parse_duration("2 - 5 minutes"), Some(TimeDelta::minutes(5)));
    }

    #[test]
    fn nothing_recognized_is_none() {
        assert_eq!(parse_duration("unknown"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("ongoing"), None);
    }
}
