use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::fetch::fetch_page;
use crate::app::types::{EventReference, ScrapeError};

pub const DEFAULT_BASE_URL: &str = "https://nuforc.org/webreports/";

/// Page under the base URL listing one link per calendar month of reports.
pub const MONTH_INDEX_PAGE: &str = "ndxevent.html";

/// Month links encode the month as a six-digit `YYYYMM` token at a fixed
/// offset inside the href, e.g. `ndxe202212.html`.
const MONTH_TOKEN_RANGE: std::ops::Range<usize> = 4..10;

/// Fetch and parse the root index page into a month -> URL lookup.
///
/// This is the one unrecoverable dependency of a scrape run: if the root
/// page cannot be fetched after retries, or parses to nothing, the run
/// cannot proceed and an error is returned.
pub async fn resolve_month_index(
    client: &Client,
    base: &Url,
    max_retries: usize,
) -> Result<BTreeMap<NaiveDate, Url>, ScrapeError> {
    let index_url = join_url(base, MONTH_INDEX_PAGE);
    let page = fetch_page(client, index_url.as_str(), max_retries, "month index")
        .await
        .map_err(|source| ScrapeError::RootIndex {
            url: index_url.to_string(),
            source,
        })?;
    if !page.is_ok() {
        return Err(ScrapeError::RootIndexStatus {
            url: index_url.to_string(),
            status: page.status,
        });
    }

    let lookup = parse_month_index(&page.text, base);
    if lookup.is_empty() {
        return Err(ScrapeError::EmptyIndex {
            url: index_url.to_string(),
        });
    }
    info!(months = lookup.len(), "month index resolved");
    Ok(lookup)
}

/// Parse root index HTML into a month -> URL lookup. The first anchor is a
/// header link, not a month; anchors whose href carries no `YYYYMM` token
/// are skipped.
pub fn parse_month_index(html: &str, base: &Url) -> BTreeMap<NaiveDate, Url> {
    let doc = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return BTreeMap::new(),
    };

    let mut lookup = BTreeMap::new();
    for anchor in doc.select(&selector).skip(1) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(month) = month_from_href(href) else {
            debug!(href, "skipping anchor without month token");
            continue;
        };
        let Ok(url) = base.join(href) else {
            continue;
        };
        lookup.insert(month, url);
    }
    lookup
}

fn month_from_href(href: &str) -> Option<NaiveDate> {
    let token = href.get(MONTH_TOKEN_RANGE)?;
    if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = token[..4].parse().ok()?;
    let month: u32 = token[4..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Fetch a month page and parse its event anchors into date -> URL
/// references. Non-fatal: any failure logs and yields an empty list so the
/// batch can continue without this month.
pub async fn resolve_event_urls(
    client: &Client,
    month_url: &Url,
    base: &Url,
    max_retries: usize,
) -> Vec<EventReference> {
    match fetch_page(client, month_url.as_str(), max_retries, "month page").await {
        Ok(page) if page.is_ok() => parse_event_urls(&page.text, base),
        Ok(page) => {
            error!(url = %month_url, status = page.status, "month page returned error status");
            Vec::new()
        }
        Err(err) => {
            error!(url = %month_url, error = %err, "month page failed during scraping attempt");
            Vec::new()
        }
    }
}

/// Parse month page HTML. Anchor text is a free-text date description;
/// entries whose date cannot be parsed are omitted.
pub fn parse_event_urls(html: &str, base: &Url) -> Vec<EventReference> {
    let doc = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut references = Vec::new();
    for anchor in doc.select(&selector).skip(1) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            continue;
        };
        let text = anchor.text().collect::<String>();
        match parse_report_date(&text) {
            Some(date) => references.push(EventReference { date, url }),
            None => warn!(text = text.trim(), "unparseable event date, entry dropped"),
        }
    }
    references
}

/// Best-effort parse of the date descriptions used in month-page anchor
/// text, e.g. `12/15/22 21:30` or `1/2/2023`.
pub fn parse_report_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%m/%d/%y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%y %H:%M",
        "%m/%d/%Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 2] = ["%m/%d/%y", "%m/%d/%Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

pub fn join_url(base: &Url, path: &str) -> Url {
    base.join(path).unwrap_or_else(|_| base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse(DEFAULT_BASE_URL).unwrap()
    }

    const INDEX_HTML: &str = r#"
        <html><body><table>
        <a href="ndxevent.html">NUFORC Home</a>
        <a href="ndxe202212.html">12/2022</a>
        <a href="ndxe202211.html">11/2022</a>
        <a href="ndxeXXXXXX.html">garbage</a>
        </table></body></html>
    "#;

    #[test]
    fn month_index_skips_header_and_garbage() {
        let lookup = parse_month_index(INDEX_HTML, &base());
        assert_eq!(lookup.len(), 2);
        let december = NaiveDate::from_ymd_opt(2022, 12, 1).unwrap();
        assert_eq!(
            lookup.get(&december).map(Url::as_str),
            Some("https://nuforc.org/webreports/ndxe202212.html")
        );
        assert!(lookup.contains_key(&NaiveDate::from_ymd_opt(2022, 11, 1).unwrap()));
    }

    #[test]
    fn month_from_href_rejects_short_and_invalid() {
        assert_eq!(month_from_href("ndxe"), None);
        assert_eq!(month_from_href("ndxe209913.html"), None);
        assert_eq!(
            month_from_href("ndxe202201.html"),
            NaiveDate::from_ymd_opt(2022, 1, 1)
        );
    }

    const MONTH_HTML: &str = r#"
        <html><body><table>
        <a href="ndxevent.html">Back</a>
        <a href="reports/100/S100001.html">12/15/22 21:30</a>
        <a href="reports/100/S100002.html">12/1/2022</a>
        <a href="reports/100/S100003.html">sometime last winter</a>
        </table></body></html>
    "#;

    #[test]
    fn event_urls_skip_header_and_unparseable_dates() {
        let refs = parse_event_urls(MONTH_HTML, &base());
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[0].url.as_str(),
            "https://nuforc.org/webreports/reports/100/S100001.html"
        );
        assert_eq!(
            refs[0].date,
            NaiveDate::from_ymd_opt(2022, 12, 15)
                .unwrap()
                .and_hms_opt(21, 30, 0)
                .unwrap()
        );
        assert_eq!(
            refs[1].date,
            NaiveDate::from_ymd_opt(2022, 12, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn report_date_formats() {
        assert!(parse_report_date("").is_none());
        assert!(parse_report_date("not a date").is_none());
        assert_eq!(
            parse_report_date(" 6/5/2019 "),
            NaiveDate::from_ymd_opt(2019, 6, 5).unwrap().and_hms_opt(0, 0, 0)
        );
    }
}
