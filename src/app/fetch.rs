use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Raw content of a fetched URL. Ephemeral: consumed by a parser right away,
/// never persisted.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub status: u16,
    pub text: String,
}

impl RawPage {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn attempts(&self) -> usize {
        match self {
            FetchError::RetriesExhausted { attempts, .. } => *attempts,
        }
    }
}

pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15))
        .pool_max_idle_per_host(32)
        .build()
}

/// GET a page with bounded retry on transient failures.
///
/// Only network-level errors (connect failure, timeout, broken body read) are
/// retried; HTTP error statuses are returned inside [`RawPage`] for the
/// caller to interpret. Never panics: after `max_retries` consecutive
/// transient failures the terminal error is returned as a value.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    max_retries: usize,
    page_label: &str,
) -> Result<RawPage, FetchError> {
    let max_attempts = max_retries.max(1);

    for attempt in 1..=max_attempts {
        let result = match client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                response.text().await.map(|text| RawPage { status, text })
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(page) => {
                debug!(%url, status = page.status, "{page_label} downloaded");
                return Ok(page);
            }
            Err(err) => {
                let transient =
                    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body();
                if !transient || attempt == max_attempts {
                    error!(%url, attempts = attempt, error = %err, "{page_label} download failed");
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                warn!(
                    %url,
                    retries_left = max_attempts - attempt,
                    error = %err,
                    "{page_label} download failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(120 * attempt as u64)).await;
            }
        }
    }

    unreachable!("fetch loop returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused_url() -> String {
        // Bind to grab a free port, then drop the listener so connections
        // are refused deterministically.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/")
    }

    #[tokio::test]
    async fn retry_bound_is_exact() {
        let client = build_client().unwrap();
        let err = fetch_page(&client, &refused_url(), 3, "event page")
            .await
            .expect_err("connection should be refused");
        assert_eq!(err.attempts(), 3);
    }

    #[tokio::test]
    async fn zero_retries_still_attempts_once() {
        let client = build_client().unwrap();
        let err = fetch_page(&client, &refused_url(), 0, "event page")
            .await
            .expect_err("connection should be refused");
        assert_eq!(err.attempts(), 1);
    }
}
