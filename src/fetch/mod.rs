// src/fetch/mod.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{Map, Value as Json};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Retry policy for [`get_json`].
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// GET `url` and decode the body as JSON.
///
/// Transport and decode failures are retried up to `retry.max_retries`
/// attempts in total; a non-success status fails immediately.
pub async fn get_json(client: &Client, url: &str, retry: Retry) -> Result<Json> {
    let url = Url::parse(url).with_context(|| format!("invalid url `{}`", url))?;
    let max = retry.max_retries.max(1);
    let mut attempt = 0;

    // retry loop
    loop {
        attempt += 1;
        debug!(url = %url, attempt, "GET");

        // 1) request
        let resp = client.get(url.clone()).send().await;
        match resp {
            Ok(resp) if resp.status().is_success() => {
                // 2) decode body
                match resp.json::<Json>().await {
                    Ok(body) => return Ok(body),
                    Err(e) if attempt < max => {
                        warn!(url = %url, attempt, error = %e, "decode failed, retrying");
                        sleep(retry.delay).await;
                    }
                    Err(e) => {
                        return Err(e).with_context(|| format!("decoding JSON from `{}`", url))
                    }
                }
            }
            Ok(resp) => return Err(anyhow!("HTTP error from `{}`: {}", url, resp.status())),
            Err(e) if attempt < max => {
                warn!(url = %url, attempt, error = %e, "request failed, retrying");
                sleep(retry.delay).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("GET `{}` failed after {} attempts", url, attempt))
            }
        }
    }
}

/// Split a JSON array of objects into its records.
pub fn json_records(body: Json) -> Result<Vec<Map<String, Json>>> {
    let Json::Array(items) = body else {
        return Err(anyhow!("expected a JSON array of records"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Json::Object(map) => Ok(map),
            other => Err(anyhow!("record {} is not an object: {}", i, other)),
        })
        .collect()
}

/// GET `url`, expecting an array of JSON objects.
pub async fn fetch_records(client: &Client, url: &str, retry: Retry) -> Result<Vec<Map<String, Json>>> {
    let records = json_records(get_json(client, url, retry).await?)?;
    info!(url = %url, records = records.len(), "fetched records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;

    #[test]
    fn test_json_records_wants_objects() -> Result<()> {
        let records = json_records(json!([{"date": 20210307, "positive": 28756489}, {"date": 20210306}]))?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["date"], json!(20210306));

        assert!(json_records(json!({"date": 1})).is_err());
        assert!(json_records(json!([1, 2])).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_host_gives_up() -> Result<()> {
        // grab a free port, then close it so connects are refused
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let retry = Retry {
            max_retries: 2,
            delay: Duration::from_millis(1),
        };
        let err = get_json(&Client::new(), &format!("http://127.0.0.1:{}/x.json", port), retry)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("after 2 attempts"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_url_is_rejected() {
        let err = get_json(&Client::new(), "not a url", Retry::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid url"));
    }
}
