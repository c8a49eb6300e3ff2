use clap::Parser;
use tracing::info;

use crate::app::data_io::{default_output_path, detect_data_format, write_batch};
use crate::app::scrape::{ScrapeConfig, scrape};
use crate::app::types::{Cli, DataFormat, EventRecord, ScrapeError};

/// Parse the CLI, run the scrape, and persist the batch.
pub async fn run() -> Result<(), ScrapeError> {
    let cli = Cli::parse();
    let config = ScrapeConfig::from(&cli);

    let mut records = scrape(&config).await?;
    sort_records(&mut records);

    let fallback: DataFormat = cli.format.into();
    let (output_path, format) = match cli.output {
        Some(path) => {
            let format = detect_data_format(&path, fallback);
            (path, format)
        }
        None => (default_output_path(fallback), fallback),
    };

    write_batch(&output_path, format, &records)?;

    let ok = records.iter().filter(|r| r.report_ok).count();
    info!(
        events = records.len(),
        ok,
        failed = records.len() - ok,
        output = %output_path,
        "batch written"
    );
    Ok(())
}

/// Deterministic output order: occurrence time, unparsed first, then URL as
/// the tiebreak. Worker completion order is arbitrary so this is the only
/// ordering the output guarantees.
fn sort_records(records: &mut [EventRecord]) {
    records.sort_by(|a, b| {
        let ka = a.occurred_time.as_parsed().copied();
        let kb = b.occurred_time.as_parsed().copied();
        ka.cmp(&kb).then_with(|| a.url.cmp(&b.url))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::types::Field;
    use chrono::NaiveDate;

    fn record(url: &str, occurred: Option<(u32, u32)>) -> EventRecord {
        EventRecord {
            url: url.to_string(),
            occurred_time: Field::from_option(occurred.map(|(m, d)| {
                NaiveDate::from_ymd_opt(2022, m, d)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            })),
            reported_time: Field::Unparsed,
            entered_as_time: Field::Unparsed,
            shape: Field::Unparsed,
            duration: Field::Unparsed,
            city: Field::Unparsed,
            state: Field::Unparsed,
            state_abbreviation: Field::Unparsed,
            country: Field::Unparsed,
            description: Field::Unparsed,
            raw_text: String::new(),
            report_ok: true,
        }
    }

    #[test]
    fn records_sort_by_time_then_url() {
        let mut records = vec![
            record("https://x/b", Some((6, 20))),
            record("https://x/c", None),
            record("https://x/a", Some((6, 10))),
            record("https://x/d", Some((6, 10))),
        ];
        sort_records(&mut records);
        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://x/c", "https://x/a", "https://x/d", "https://x/b"]
        );
    }
}
