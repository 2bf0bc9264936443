use rand::Rng;

use crate::candle::{now_ms, Candle, Granularity};

/// Base price the fallback walk starts from when no live data ever arrived.
pub const DEFAULT_BASE_PRICE: f64 = 60_000.0;
/// Length of a generated fallback series.
pub const DEFAULT_PERIODS: usize = 30;

const WALK_STEP: f64 = 100.0;
const WICK_REACH: f64 = 100.0;
const PRICE_FLOOR: f64 = 1.0;

/// Random-walk OHLC history ending one bucket before `now_ms`, oldest first.
///
/// The output is structurally identical to fetched data: strictly increasing
/// timestamps, each open equal to the previous close, and wicks that always
/// enclose the body, so it can be fed straight into the layout pass.
pub fn walk_history<R: Rng>(
    rng: &mut R,
    granularity: Granularity,
    periods: usize,
    base_price: f64,
    now_ms: i64,
) -> Vec<Candle> {
    let bucket = granularity.bucket_ms();
    let mut prev_close = base_price;
    let mut out = Vec::with_capacity(periods);

    for i in 0..periods {
        let open = prev_close;
        let close = (prev_close + rng.gen_range(-WALK_STEP..WALK_STEP)).max(PRICE_FLOOR);
        let high = open.max(close) + rng.gen_range(0.0..WICK_REACH);
        let low = (open.min(close) - rng.gen_range(0.0..WICK_REACH)).max(0.0);

        out.push(Candle {
            ts_ms: now_ms - (periods - i) as i64 * bucket,
            open,
            high,
            low,
            close,
        });
        prev_close = close;
    }

    out
}

/// Fallback series for when the upstream feed is unavailable.
pub fn fallback_history(granularity: Granularity, periods: usize) -> Vec<Candle> {
    walk_history(
        &mut rand::thread_rng(),
        granularity,
        periods,
        DEFAULT_BASE_PRICE,
        now_ms(),
    )
}

/// One simulated price observation continuing from `last_close`, for keeping
/// a synthetic chart alive between resyncs.
pub fn walk_tick<R: Rng>(rng: &mut R, last_close: f64) -> f64 {
    (last_close + rng.gen_range(-WALK_STEP..WALK_STEP)).max(PRICE_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_history_has_valid_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = 1_700_000_000_000;
        let candles = walk_history(&mut rng, Granularity::H1, 30, DEFAULT_BASE_PRICE, now);

        assert_eq!(candles.len(), 30);
        for pair in candles.windows(2) {
            assert!(pair[1].ts_ms > pair[0].ts_ms);
            assert_eq!(pair[1].open, pair[0].close);
        }
        for c in &candles {
            assert!(c.low <= c.open.min(c.close));
            assert!(c.high >= c.open.max(c.close));
            assert!(c.ts_ms < now);
        }
    }

    #[test]
    fn generation_is_reproducible_for_a_seed() {
        let now = 1_700_000_000_000;
        let a = walk_history(&mut StdRng::seed_from_u64(42), Granularity::H4, 10, 500.0, now);
        let b = walk_history(&mut StdRng::seed_from_u64(42), Granularity::H4, 10, 500.0, now);
        assert_eq!(a, b);
    }

    #[test]
    fn walk_tick_stays_positive() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut price = 5.0;
        for _ in 0..1_000 {
            price = walk_tick(&mut rng, price);
            assert!(price >= PRICE_FLOOR);
        }
    }
}
