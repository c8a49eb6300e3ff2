use std::collections::{BTreeMap, VecDeque};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::task::JoinSet;
use tracing::{error, info};
use url::Url;

use crate::app::extract::{BLANK_REPORT, DOWNLOAD_FAILED, extract_report};
use crate::app::fetch::{RawPage, build_client, fetch_page};
use crate::app::index::{resolve_event_urls, resolve_month_index};
use crate::app::types::{
    Cli, EventRecord, EventReference, ScrapeError, ScrapeModeArg,
};

pub const MAX_CONCURRENCY: usize = 256;

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub mode: ScrapeModeArg,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub retries: usize,
    pub concurrency: usize,
    pub base_url: String,
}

impl From<&Cli> for ScrapeConfig {
    fn from(cli: &Cli) -> Self {
        ScrapeConfig {
            mode: cli.mode,
            start: cli.from,
            end: cli.to,
            retries: cli.retries,
            concurrency: cli.concurrency,
            base_url: cli.base_url.clone(),
        }
    }
}

/// Validated timespan bounds; `None` in full mode.
fn validate_timespan(config: &ScrapeConfig) -> Result<Option<(NaiveDate, NaiveDate)>, ScrapeError> {
    match config.mode {
        ScrapeModeArg::Full => Ok(None),
        ScrapeModeArg::Timespan => {
            let (Some(start), Some(end)) = (config.start, config.end) else {
                return Err(ScrapeError::TimespanBounds);
            };
            if start > end {
                return Err(ScrapeError::TimespanOrder { start, end });
            }
            Ok(Some((start, end)))
        }
    }
}

fn sanitize_concurrency(value: usize) -> usize {
    value.clamp(1, MAX_CONCURRENCY)
}

/// Months from the index that overlap `[start, end]`. Selection is coarse by
/// month; the exact per-event date filter happens after the references are
/// merged.
fn select_months(
    index: &BTreeMap<NaiveDate, Url>,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> Vec<Url> {
    match bounds {
        None => index.values().cloned().collect(),
        Some((start, end)) => {
            let first_month = start.with_day(1).unwrap_or(start);
            index
                .range(first_month..)
                .take_while(|(month, _)| **month <= end)
                .map(|(_, url)| url.clone())
                .collect()
        }
    }
}

fn within_bounds(date: NaiveDateTime, bounds: Option<(NaiveDate, NaiveDate)>) -> bool {
    match bounds {
        None => true,
        Some((start, end)) => {
            let day = date.date();
            start <= day && day <= end
        }
    }
}

/// Run a full scrape: resolve the month index, fan out over the selected
/// month pages, then fan out over every event reference in the window.
///
/// The returned batch contains every event that fetched and processed;
/// per-unit failures are logged and excluded without aborting the run.
/// Completion order across workers is arbitrary, so the batch order is too.
pub async fn scrape(config: &ScrapeConfig) -> Result<Vec<EventRecord>, ScrapeError> {
    // Configuration problems are rejected before any network activity.
    let bounds = validate_timespan(config)?;
    let concurrency = sanitize_concurrency(config.concurrency);

    let base = Url::parse(&config.base_url).map_err(|source| ScrapeError::BaseUrl {
        url: config.base_url.clone(),
        source,
    })?;
    let client = build_client().map_err(ScrapeError::Client)?;

    // The one unrecoverable dependency: without the root index there is
    // nothing to scrape.
    let month_index = resolve_month_index(&client, &base, config.retries).await?;
    let month_urls = select_months(&month_index, bounds);
    info!(
        months = month_urls.len(),
        mode = ?config.mode,
        "selected month pages"
    );

    // Phase 1: resolve event URLs from every selected month page.
    let retries = config.retries;
    let references = {
        let base = base.clone();
        let client = client.clone();
        fan_out(month_urls, concurrency, move |month_url| {
            let base = base.clone();
            let client = client.clone();
            async move { resolve_event_urls(&client, &month_url, &base, retries).await }
        })
        .await
    };
    let mut references: Vec<EventReference> = references.into_iter().flatten().collect();
    references.retain(|reference| within_bounds(reference.date, bounds));
    info!(events = references.len(), "event references resolved");

    // Phase 2: fetch and process every event. Starts only once phase 1 has
    // fully joined.
    let records = fan_out(references, concurrency, move |reference| {
        let client = client.clone();
        async move { scrape_event(&client, &reference, retries).await }
    })
    .await;
    let records: Vec<EventRecord> = records.into_iter().flatten().collect();
    info!(events = records.len(), "scrape complete");
    Ok(records)
}

/// Bounded fan-out over a work queue with a single join point: no more than
/// `concurrency` tasks in flight, and the output is only assembled after
/// every task reached a terminal state. A panicked worker is logged and
/// dropped; it never aborts its siblings.
async fn fan_out<I, T, F, Fut>(inputs: Vec<I>, concurrency: usize, make_task: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut queue: VecDeque<I> = inputs.into();
    let mut set: JoinSet<T> = JoinSet::new();
    let mut out = Vec::with_capacity(queue.len());

    loop {
        while set.len() < concurrency {
            let Some(input) = queue.pop_front() else {
                break;
            };
            set.spawn(make_task(input));
        }

        if set.is_empty() {
            break;
        }

        if let Some(joined) = set.join_next().await {
            match joined {
                Ok(value) => out.push(value),
                Err(err) => error!(error = %err, "scrape worker failed"),
            }
        }
    }

    out
}

/// Fetch and process one event page. Any failure is logged with the
/// offending URL and yields `None` so the batch continues.
async fn scrape_event(
    client: &Client,
    reference: &EventReference,
    retries: usize,
) -> Option<EventRecord> {
    let url = reference.url.as_str();
    match fetch_page(client, url, retries, "event page").await {
        Ok(page) => {
            let raw_text = raw_report(url, &page);
            Some(extract_report(url, &raw_text))
        }
        Err(err) => {
            error!(%url, error = %err, "event returned an unhandled failure during scraping attempt");
            None
        }
    }
}

/// Raw text of one event: the URL on line 0 followed by the page body.
/// The extraction engine's description heuristic counts on that layout
/// (lines 0-1 are URL and table-header noise). Sentinel bodies keep the
/// URL line too, so every audit record says which page it came from.
fn raw_report(url: &str, page: &RawPage) -> String {
    format!("{url}\n{}", raw_report_text(page))
}

/// The meaningful content of an event page is the concatenated text of its
/// `<tr>` elements. A non-200 status or an empty document degrade to the
/// failure sentinels instead of an error.
pub fn raw_report_text(page: &RawPage) -> String {
    if !page.is_ok() {
        return DOWNLOAD_FAILED.to_string();
    }
    if page.text.trim().is_empty() {
        return BLANK_REPORT.to_string();
    }

    let doc = Html::parse_document(&page.text);
    let selector = match Selector::parse("tr") {
        Ok(s) => s,
        Err(_) => return BLANK_REPORT.to_string(),
    };
    let raw = doc
        .select(&selector)
        .map(|row| row.text().collect::<String>())
        .collect::<String>();
    if raw.trim().is_empty() {
        BLANK_REPORT.to_string()
    } else {
        raw
    }
}
