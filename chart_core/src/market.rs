use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::candle::{Candle, Granularity};
use crate::synthetic;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(15);
/// How many candles a history request asks for.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("market data request timed out")]
    Timeout,
    #[error("market data request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected market data payload: {0}")]
    BadPayload(String),
}

/// Where the series on screen came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Live,
    Synthetic,
}

impl DataOrigin {
    pub fn label(self) -> &'static str {
        match self {
            DataOrigin::Live => "live",
            DataOrigin::Synthetic => "synthetic",
        }
    }
}

/// Thin client for a klines-shaped market data endpoint. Any provider that
/// returns ordered `[ts, open, high, low, close, ...]` rows works; requests
/// that outlive the deadline are abandoned, never retried.
#[derive(Debug, Clone)]
pub struct MarketClient {
    http: reqwest::Client,
    base_url: String,
    deadline: Duration,
}

impl Default for MarketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Ordered OHLC history, oldest first.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            granularity.api_code(),
            limit
        );
        let payload = self.get_json(&url).await?;
        parse_klines(&payload)
    }

    /// Latest traded price for the symbol.
    pub async fn fetch_price(&self, symbol: &str) -> Result<f64, FeedError> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);
        let payload = self.get_json(&url).await?;
        payload
            .get("price")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| FeedError::BadPayload("ticker response missing price".into()))
    }

    /// History with the local fallback applied: any feed error (timeout,
    /// transport, bad payload, empty body) is recovered by substituting a
    /// synthetic series so the chart is never blank.
    pub async fn history_or_fallback(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> (Vec<Candle>, DataOrigin) {
        match self.fetch_history(symbol, granularity, limit).await {
            Ok(candles) if !candles.is_empty() => (candles, DataOrigin::Live),
            Ok(_) => {
                warn!(symbol, "history response was empty, using synthetic series");
                (
                    synthetic::fallback_history(granularity, synthetic::DEFAULT_PERIODS),
                    DataOrigin::Synthetic,
                )
            }
            Err(err) => {
                warn!(symbol, %err, "history fetch failed, using synthetic series");
                (
                    synthetic::fallback_history(granularity, synthetic::DEFAULT_PERIODS),
                    DataOrigin::Synthetic,
                )
            }
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, FeedError> {
        let request = async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            Ok::<Value, FeedError>(response.json::<Value>().await?)
        };
        match tokio::time::timeout(self.deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout),
        }
    }
}

/// Parse a klines payload: an array of rows, each at least
/// `[open_time_ms, open, high, low, close, ...]` with prices as strings or
/// numbers. Malformed rows are skipped; a non-array payload is an error.
pub fn parse_klines(payload: &Value) -> Result<Vec<Candle>, FeedError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| FeedError::BadPayload("klines response is not an array".into()))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(fields) = row.as_array() else {
            continue;
        };
        if fields.len() < 5 {
            continue;
        }
        let Some(ts_ms) = fields[0].as_i64() else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            price_field(&fields[1]),
            price_field(&fields[2]),
            price_field(&fields[3]),
            price_field(&fields[4]),
        ) else {
            continue;
        };
        out.push(Candle {
            ts_ms,
            open,
            high,
            low,
            close,
        });
    }
    Ok(out)
}

fn price_field(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use std::thread;

    const KLINES_SAMPLE: &str = r#"[
        [1700000000000, "60100.00", "60350.50", "59900.25", "60200.00", "123.4", 1700003599999, "0", 100, "0", "0", "0"],
        [1700003600000, "60200.00", "60500.00", "60150.00", "60450.75", "98.7", 1700007199999, "0", 90, "0", "0", "0"],
        [1700007200000, "60450.75", "60470.00", "59800.00", "59950.00", "110.0", 1700010799999, "0", 95, "0", "0", "0"]
    ]"#;

    /// Serve every incoming request with `body` after `delay`.
    fn spawn_stub(body: &'static str, delay: Duration) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind stub server");
        let addr = server.server_addr().to_ip().expect("stub server ip");
        thread::spawn(move || {
            for request in server.incoming_requests() {
                thread::sleep(delay);
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("header");
                let _ = request.respond(tiny_http::Response::from_string(body).with_header(header));
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn parses_sample_klines_in_order() {
        let payload: Value = serde_json::from_str(KLINES_SAMPLE).unwrap();
        let candles = parse_klines(&payload).unwrap();
        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|p| p[0].ts_ms < p[1].ts_ms));
        assert_eq!(candles[0].open, 60100.0);
        assert_eq!(candles[2].close, 59950.0);
    }

    #[test]
    fn skips_malformed_rows() {
        let payload: Value =
            serde_json::from_str(r#"[[1, "2", "3"], "junk", [1700000000000, "1.0", "2.0", "0.5", "1.5"]]"#)
                .unwrap();
        let candles = parse_klines(&payload).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 1.5);
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let payload: Value = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            parse_klines(&payload),
            Err(FeedError::BadPayload(_))
        ));
    }

    #[tokio::test]
    async fn fetch_history_parses_served_payload() {
        let base = spawn_stub(KLINES_SAMPLE, Duration::from_millis(0));
        let client = MarketClient::with_base_url(base);
        let candles = client
            .fetch_history("BTCUSDT", Granularity::H1, 100)
            .await
            .unwrap();
        assert_eq!(candles.len(), 3);
    }

    #[tokio::test]
    async fn fetch_price_parses_ticker_payload() {
        let base = spawn_stub(r#"{"symbol":"BTCUSDT","price":"60123.45"}"#, Duration::from_millis(0));
        let client = MarketClient::with_base_url(base);
        let price = client.fetch_price("BTCUSDT").await.unwrap();
        assert_eq!(price, 60123.45);
    }

    #[tokio::test]
    async fn slow_response_hits_the_deadline() {
        let base = spawn_stub(KLINES_SAMPLE, Duration::from_millis(500));
        let client = MarketClient::with_base_url(base).with_deadline(Duration::from_millis(50));
        let err = client
            .fetch_history("BTCUSDT", Granularity::H1, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Timeout));
    }

    #[tokio::test]
    async fn fallback_series_keeps_the_chart_alive() {
        // Nothing listens here, so the fetch fails outright.
        let client = MarketClient::with_base_url("http://127.0.0.1:1")
            .with_deadline(Duration::from_millis(500));
        let (candles, origin) = client
            .history_or_fallback("BTCUSDT", Granularity::H1, 100)
            .await;

        assert_eq!(origin, DataOrigin::Synthetic);
        assert_eq!(candles.len(), synthetic::DEFAULT_PERIODS);
        let layout = Layout::compute(&candles, Granularity::H1, 800.0, 400.0);
        assert!(!layout.is_empty());
        for shape in &layout.candles {
            assert!(shape.body_top.is_finite() && shape.wick_top.is_finite());
        }
    }
}
