use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One time-bucketed OHLC price record. Timestamps are milliseconds since
/// epoch and must be strictly increasing across a series; the usual
/// `low <= open/close <= high` ordering is assumed, not validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// A candle where all four prices start at the same value.
    pub fn flat(ts_ms: i64, price: f64) -> Self {
        Self {
            ts_ms,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Close strictly above open. A flat candle counts as bearish, which
    /// only affects color selection.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Display time-bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    H1,
    H4,
    D1,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::H1, Granularity::H4, Granularity::D1];

    /// Bucket duration in milliseconds.
    pub fn bucket_ms(self) -> i64 {
        match self {
            Granularity::H1 => 3_600_000,
            Granularity::H4 => 14_400_000,
            Granularity::D1 => 86_400_000,
        }
    }

    /// Interval code used by the upstream klines endpoint.
    pub fn api_code(self) -> &'static str {
        match self {
            Granularity::H1 => "1h",
            Granularity::H4 => "4h",
            Granularity::D1 => "1d",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::H1 => "1H",
            Granularity::H4 => "4H",
            Granularity::D1 => "1D",
        }
    }

    /// Lenient parse for settings files; unknown strings fall back to 1H.
    pub fn parse(s: &str) -> Granularity {
        match s.trim().to_ascii_lowercase().as_str() {
            "4h" => Granularity::H4,
            "1d" | "d" | "daily" => Granularity::D1,
            _ => Granularity::H1,
        }
    }

    /// Next granularity in display order, wrapping around.
    pub fn next(self) -> Granularity {
        match self {
            Granularity::H1 => Granularity::H4,
            Granularity::H4 => Granularity::D1,
            Granularity::D1 => Granularity::H1,
        }
    }
}

/// Wall-clock milliseconds since epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullish_requires_close_above_open() {
        let mut c = Candle::flat(0, 100.0);
        assert!(!c.is_bullish());
        c.close = 101.0;
        assert!(c.is_bullish());
        c.close = 99.0;
        assert!(!c.is_bullish());
    }

    #[test]
    fn granularity_cycles_through_all() {
        let mut g = Granularity::H1;
        for _ in 0..Granularity::ALL.len() {
            g = g.next();
        }
        assert_eq!(g, Granularity::H1);
    }

    #[test]
    fn granularity_parse_is_lenient() {
        assert_eq!(Granularity::parse("4H"), Granularity::H4);
        assert_eq!(Granularity::parse(" 1d "), Granularity::D1);
        assert_eq!(Granularity::parse("garbage"), Granularity::H1);
    }
}
