use std::fs::File;
use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use crate::app::types::{DataFormat, EventRecord, Field, ScrapeError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const CSV_HEADERS: [&str; 13] = [
    "url",
    "occurred_time",
    "reported_time",
    "entered_as_time",
    "shape",
    "duration_seconds",
    "city",
    "state",
    "state_abbreviation",
    "country",
    "description",
    "report_ok",
    "raw_text",
];

/// Flat serialization view of an [`EventRecord`]. Every unparsed field
/// renders as the literal `unparsed` so consumers never have to guess
/// whether a blank cell means missing or empty.
#[derive(Debug, Clone, Serialize)]
struct ExportRecord {
    url: String,
    occurred_time: String,
    reported_time: String,
    entered_as_time: String,
    shape: String,
    duration_seconds: String,
    city: String,
    state: String,
    state_abbreviation: String,
    country: String,
    description: String,
    report_ok: bool,
    raw_text: String,
}

fn render_time(field: &Field<chrono::NaiveDateTime>) -> String {
    match field {
        Field::Parsed(t) => t.format(TIMESTAMP_FORMAT).to_string(),
        Field::Unparsed => "unparsed".to_string(),
    }
}

fn render_duration(field: &Field<chrono::TimeDelta>) -> String {
    match field {
        Field::Parsed(d) => d.num_seconds().to_string(),
        Field::Unparsed => "unparsed".to_string(),
    }
}

fn event_to_export_record(event: &EventRecord) -> ExportRecord {
    ExportRecord {
        url: event.url.clone(),
        occurred_time: render_time(&event.occurred_time),
        reported_time: render_time(&event.reported_time),
        entered_as_time: render_time(&event.entered_as_time),
        shape: event.shape.render(),
        duration_seconds: render_duration(&event.duration),
        city: event.city.render(),
        state: event.state.render(),
        state_abbreviation: event.state_abbreviation.render(),
        country: event.country.render(),
        description: event.description.render(),
        report_ok: event.report_ok,
        raw_text: event.raw_text.clone(),
    }
}

pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    fn new(output_path: &str) -> Result<Self, ScrapeError> {
        let file = File::create(output_path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(CSV_HEADERS)?;
        Ok(Self { writer })
    }

    fn write_event(&mut self, event: &EventRecord) -> Result<(), ScrapeError> {
        let rec = event_to_export_record(event);
        self.writer.write_record([
            rec.url,
            rec.occurred_time,
            rec.reported_time,
            rec.entered_as_time,
            rec.shape,
            rec.duration_seconds,
            rec.city,
            rec.state,
            rec.state_abbreviation,
            rec.country,
            rec.description,
            rec.report_ok.to_string(),
            rec.raw_text,
        ])?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), ScrapeError> {
        self.writer.flush()?;
        Ok(())
    }
}

pub struct JsonSink {
    file: File,
    first: bool,
    closed: bool,
}

impl JsonSink {
    fn new(output_path: &str) -> Result<Self, ScrapeError> {
        let mut file = File::create(output_path)?;
        file.write_all(b"[\n")?;
        Ok(Self {
            file,
            first: true,
            closed: false,
        })
    }

    fn write_event(&mut self, event: &EventRecord) -> Result<(), ScrapeError> {
        let rec = event_to_export_record(event);
        if !self.first {
            self.file.write_all(b",\n")?;
        }
        self.first = false;
        serde_json::to_writer(&mut self.file, &rec)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), ScrapeError> {
        if !self.closed {
            if self.first {
                self.file.write_all(b"]\n")?;
            } else {
                self.file.write_all(b"\n]\n")?;
            }
            self.closed = true;
        }
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for JsonSink {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}

pub enum OutputSink {
    Csv(CsvSink),
    Json(JsonSink),
}

impl OutputSink {
    pub fn new(output_path: &str, format: DataFormat) -> Result<Self, ScrapeError> {
        match format {
            DataFormat::Csv => Ok(OutputSink::Csv(CsvSink::new(output_path)?)),
            DataFormat::Json => Ok(OutputSink::Json(JsonSink::new(output_path)?)),
        }
    }

    pub fn write_event(&mut self, event: &EventRecord) -> Result<(), ScrapeError> {
        match self {
            OutputSink::Csv(sink) => sink.write_event(event),
            OutputSink::Json(sink) => sink.write_event(event),
        }
    }

    pub fn finalize(&mut self) -> Result<(), ScrapeError> {
        match self {
            OutputSink::Csv(sink) => sink.finalize(),
            OutputSink::Json(sink) => sink.finalize(),
        }
    }
}

/// Write a whole batch and flush. The batch is the unit of output; partial
/// files only appear if an individual write fails midway.
pub fn write_batch(
    output_path: &str,
    format: DataFormat,
    events: &[EventRecord],
) -> Result<(), ScrapeError> {
    let mut sink = OutputSink::new(output_path, format)?;
    for event in events {
        sink.write_event(event)?;
    }
    sink.finalize()
}

pub fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else {
        fallback
    }
}

pub fn default_output_path(format: DataFormat) -> String {
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    match format {
        DataFormat::Csv => format!("nuforc_events_{ts}.csv"),
        DataFormat::Json => format!("nuforc_events_{ts}.json"),
    }
}
