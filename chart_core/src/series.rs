use crate::candle::{Candle, Granularity};

/// Live retention: oldest candles are evicted once a rollover pushes the
/// series past this many entries. History replacement is not clamped.
pub const DEFAULT_CAPACITY: usize = 30;

/// Ordered, bounded OHLC series for one chart instance. Insertion order is
/// display order, oldest on the left.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    granularity: Granularity,
    capacity: usize,
    candles: Vec<Candle>,
}

/// What a folded price observation did to the series, with enough detail for
/// a caller to repaint only the affected candle.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesUpdate {
    /// The latest candle absorbed the price in place.
    Mutated {
        index: usize,
        previous: Candle,
        candle: Candle,
    },
    /// The bucket rolled over: a new candle was appended, possibly pushing
    /// the oldest one out.
    Rolled {
        index: usize,
        candle: Candle,
        evicted: Option<Candle>,
    },
}

impl ChartSeries {
    pub fn new(granularity: Granularity) -> Self {
        Self::with_capacity(granularity, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(granularity: Granularity, capacity: usize) -> Self {
        Self {
            granularity,
            capacity: capacity.max(1),
            candles: Vec::new(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Newest `n` candles (all of them when `n` exceeds the length).
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    /// Swap the contents wholesale, e.g. after a granularity switch or a
    /// history resync. Retention is a live-append concern and is not applied
    /// here.
    pub fn replace_all(&mut self, granularity: Granularity, candles: Vec<Candle>) {
        self.granularity = granularity;
        self.candles = candles;
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }

    /// Min low / max high over the whole series.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        if self.candles.is_empty() {
            return None;
        }
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for c in &self.candles {
            lo = lo.min(c.low);
            hi = hi.max(c.high);
        }
        Some((lo, hi))
    }

    /// Fold one price observation into the series.
    ///
    /// If the latest candle's bucket has elapsed, a new candle opens at the
    /// previous close (its extremes seeded from the previous close and the new
    /// price) and the oldest candle is evicted when over capacity. Otherwise
    /// the latest candle is updated in place: close moves, high/low widen,
    /// open never changes. Returns `None` on an empty series.
    pub fn apply_tick(&mut self, now_ms: i64, price: f64) -> Option<SeriesUpdate> {
        let last = *self.candles.last()?;

        if now_ms - last.ts_ms > self.granularity.bucket_ms() {
            let candle = Candle {
                ts_ms: now_ms,
                open: last.close,
                high: last.close.max(price),
                low: last.close.min(price),
                close: price,
            };
            self.candles.push(candle);
            let mut evicted = None;
            while self.candles.len() > self.capacity {
                evicted = Some(self.candles.remove(0));
            }
            Some(SeriesUpdate::Rolled {
                index: self.candles.len() - 1,
                candle,
                evicted,
            })
        } else {
            let index = self.candles.len() - 1;
            let cur = &mut self.candles[index];
            let previous = *cur;
            cur.close = price;
            cur.high = cur.high.max(price);
            cur.low = cur.low.min(price);
            Some(SeriesUpdate::Mutated {
                index,
                previous,
                candle: *cur,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(granularity: Granularity, capacity: usize, n: usize) -> ChartSeries {
        let mut s = ChartSeries::with_capacity(granularity, capacity);
        let bucket = granularity.bucket_ms();
        let candles = (0..n)
            .map(|i| Candle {
                ts_ms: i as i64 * bucket,
                open: 100.0,
                high: 110.0,
                low: 90.0,
                close: 105.0,
            })
            .collect();
        s.replace_all(granularity, candles);
        s
    }

    #[test]
    fn tick_in_same_bucket_mutates_latest() {
        let mut s = seeded(Granularity::H1, 30, 3);
        let last_ts = s.last().unwrap().ts_ms;

        let up = s.apply_tick(last_ts + 1_000, 120.0).unwrap();
        match up {
            SeriesUpdate::Mutated {
                index,
                previous,
                candle,
            } => {
                assert_eq!(index, 2);
                assert_eq!(candle.open, previous.open);
                assert_eq!(candle.close, 120.0);
                assert_eq!(candle.high, 120.0);
                assert_eq!(candle.low, previous.low);
            }
            other => panic!("expected in-place mutation, got {other:?}"),
        }

        // A lower price widens the low but can never shrink the high.
        let up = s.apply_tick(last_ts + 2_000, 80.0).unwrap();
        match up {
            SeriesUpdate::Mutated { candle, .. } => {
                assert_eq!(candle.high, 120.0);
                assert_eq!(candle.low, 80.0);
                assert_eq!(candle.close, 80.0);
            }
            other => panic!("expected in-place mutation, got {other:?}"),
        }
    }

    #[test]
    fn elapsed_bucket_rolls_a_new_candle() {
        let mut s = seeded(Granularity::H1, 30, 3);
        let last = *s.last().unwrap();

        let now = last.ts_ms + Granularity::H1.bucket_ms() + 1;
        let up = s.apply_tick(now, 99.0).unwrap();
        match up {
            SeriesUpdate::Rolled {
                index,
                candle,
                evicted,
            } => {
                assert_eq!(index, 3);
                assert!(evicted.is_none());
                assert_eq!(candle.open, last.close);
                assert_eq!(candle.close, 99.0);
                assert_eq!(candle.high, last.close.max(99.0));
                assert_eq!(candle.low, 99.0);
            }
            other => panic!("expected rollover, got {other:?}"),
        }
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn rollover_at_capacity_evicts_oldest() {
        let mut s = seeded(Granularity::H1, 3, 3);
        let oldest_ts = s.candles()[0].ts_ms;
        let now = s.last().unwrap().ts_ms + Granularity::H1.bucket_ms() + 1;

        let up = s.apply_tick(now, 101.0).unwrap();
        match up {
            SeriesUpdate::Rolled { evicted, .. } => {
                assert_eq!(evicted.unwrap().ts_ms, oldest_ts);
            }
            other => panic!("expected rollover, got {other:?}"),
        }
        assert_eq!(s.len(), 3);
        assert!(s.len() <= s.capacity());
    }

    #[test]
    fn folded_ticks_never_shrink_the_extremes() {
        let mut s = ChartSeries::new(Granularity::H1);
        s.replace_all(Granularity::H1, vec![Candle::flat(0, 100.0)]);

        let prices = [101.0, 97.5, 103.25, 96.0, 100.5];
        for (i, p) in prices.iter().enumerate() {
            s.apply_tick(1_000 * (i as i64 + 1), *p);
        }

        let last = s.last().unwrap();
        let max_seen = prices.iter().fold(100.0f64, |a, b| a.max(*b));
        let min_seen = prices.iter().fold(100.0f64, |a, b| a.min(*b));
        assert_eq!(last.high, max_seen);
        assert_eq!(last.low, min_seen);
        assert_eq!(last.open, 100.0);
        assert_eq!(last.close, *prices.last().unwrap());
    }

    #[test]
    fn tick_on_empty_series_is_a_noop() {
        let mut s = ChartSeries::new(Granularity::H1);
        assert!(s.apply_tick(0, 100.0).is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn tail_handles_short_series() {
        let s = seeded(Granularity::H1, 30, 3);
        assert_eq!(s.tail(10).len(), 3);
        assert_eq!(s.tail(2).len(), 2);
        assert_eq!(s.tail(2)[0].ts_ms, s.candles()[1].ts_ms);
    }
}
