use crate::candle::{Candle, Granularity};

/// Fraction added to each side of the raw min/max price range.
pub const RANGE_PADDING: f64 = 0.10;
/// Price grid divisions; labels land on every division boundary, so the
/// midpoint and both extremes of the padded range always get a label.
pub const PRICE_GRID_DIVISIONS: usize = 6;
/// Upper bound on time-axis labels regardless of series length.
pub const TIME_LABEL_TARGET: usize = 6;
/// Candle bodies take this share of their horizontal slot...
pub const BODY_SLOT_SHARE: f64 = 0.8;
/// ...but never get narrower than this, so dense series stay readable.
pub const MIN_BODY_WIDTH: f64 = 4.0;
/// Flat candles still paint a sliver of body.
pub const MIN_BODY_HEIGHT: f64 = 1.0;

/// Geometry for one candle: a body rectangle over the open/close span and a
/// wick line over the low/high span, both in surface coordinates (y grows
/// downward).
#[derive(Debug, Clone, PartialEq)]
pub struct CandleShape {
    pub index: usize,
    pub body_x: f64,
    pub body_w: f64,
    pub body_top: f64,
    pub body_h: f64,
    pub wick_x: f64,
    pub wick_top: f64,
    pub wick_h: f64,
    pub bullish: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub y: f64,
    pub price: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeMark {
    pub x: f64,
    pub index: usize,
    pub label: String,
}

/// Indicator line for the latest close.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMarker {
    pub y: f64,
    pub price: f64,
    pub label: String,
    pub bullish: bool,
}

/// Full layout pass over a series snapshot. Everything here is descriptive
/// geometry; drawing belongs to the host surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    /// Padded viewport bounds. Zero/zero for an empty series.
    pub min_price: f64,
    pub max_price: f64,
    pub candles: Vec<CandleShape>,
    pub grid: Vec<GridLine>,
    pub time_marks: Vec<TimeMark>,
    pub current: Option<PriceMarker>,
}

impl Layout {
    /// Lay out `candles` onto a `width` x `height` surface.
    ///
    /// Pure: the same snapshot and dimensions always produce the same
    /// geometry. An empty snapshot yields an empty layout rather than an
    /// error, and a degenerate price range (all prices equal) is widened to a
    /// fallback span so every coordinate stays finite.
    pub fn compute(candles: &[Candle], granularity: Granularity, width: f64, height: f64) -> Layout {
        let mut layout = Layout {
            width,
            height,
            min_price: 0.0,
            max_price: 0.0,
            candles: Vec::new(),
            grid: Vec::new(),
            time_marks: Vec::new(),
            current: None,
        };
        if candles.is_empty() {
            return layout;
        }

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for c in candles {
            lo = lo.min(c.low);
            hi = hi.max(c.high);
        }
        let mut span = hi - lo;
        if !span.is_finite() || span <= 0.0 {
            span = hi.abs().max(1.0);
            lo = hi - span;
        }
        let pad = span * RANGE_PADDING;
        lo -= pad;
        hi += pad;
        let range = hi - lo;

        layout.min_price = lo;
        layout.max_price = hi;

        let n = candles.len();
        let y = |price: f64| height - ((price - lo) / range) * height;

        for (i, c) in candles.iter().enumerate() {
            layout.candles.push(candle_shape(i, c, n, width, height, lo, range));
        }

        for i in 0..=PRICE_GRID_DIVISIONS {
            let price = lo + range * (i as f64 / PRICE_GRID_DIVISIONS as f64);
            layout.grid.push(GridLine {
                y: y(price),
                price,
                label: format!("${}", format_price(price, 0)),
            });
        }

        let slot = width / n as f64;
        let stride = (n / TIME_LABEL_TARGET).max(1);
        for i in (0..n).step_by(stride) {
            layout.time_marks.push(TimeMark {
                x: i as f64 * slot,
                index: i,
                label: time_label(candles[i].ts_ms, granularity),
            });
        }

        let last = &candles[n - 1];
        layout.current = Some(PriceMarker {
            y: y(last.close),
            price: last.close,
            label: format!("${}", format_price(last.close, 2)),
            bullish: last.is_bullish(),
        });

        layout
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Surface y for a price within the current viewport.
    pub fn price_to_y(&self, price: f64) -> f64 {
        let range = self.max_price - self.min_price;
        if range <= 0.0 {
            return self.height;
        }
        self.height - ((price - self.min_price) / range) * self.height
    }

    /// Incremental path: recompute one candle's geometry against the existing
    /// viewport. Returns `None` when the candle pierces the padded bounds (or
    /// the index is stale), in which case the caller needs a full pass.
    pub fn reshape(&self, index: usize, candle: &Candle) -> Option<CandleShape> {
        let n = self.candles.len();
        if index >= n {
            return None;
        }
        if candle.high > self.max_price || candle.low < self.min_price {
            return None;
        }
        let range = self.max_price - self.min_price;
        Some(candle_shape(
            index,
            candle,
            n,
            self.width,
            self.height,
            self.min_price,
            range,
        ))
    }
}

fn candle_shape(
    index: usize,
    c: &Candle,
    n: usize,
    width: f64,
    height: f64,
    min_price: f64,
    range: f64,
) -> CandleShape {
    let slot = width / n as f64;
    let body_w = (slot * BODY_SLOT_SHARE).max(MIN_BODY_WIDTH);
    let body_x = index as f64 * slot;

    let y = |price: f64| height - ((price - min_price) / range) * height;
    let y_open = y(c.open);
    let y_close = y(c.close);
    let y_high = y(c.high);
    let y_low = y(c.low);

    CandleShape {
        index,
        body_x,
        body_w,
        body_top: y_open.min(y_close),
        body_h: (y_open - y_close).abs().max(MIN_BODY_HEIGHT),
        wick_x: body_x + body_w / 2.0,
        wick_top: y_high,
        wick_h: (y_low - y_high).max(0.0),
        bullish: c.is_bullish(),
    }
}

/// Map a horizontal pointer coordinate to the nearest candle index. Out of
/// range input clamps to the edges; only an empty series yields `None`.
pub fn candle_at_x(len: usize, pointer_x: f64, surface_w: f64) -> Option<usize> {
    if len == 0 || surface_w <= 0.0 {
        return None;
    }
    let slot = surface_w / len as f64;
    let index = (pointer_x / slot).floor() as isize;
    Some(index.clamp(0, len as isize - 1) as usize)
}

/// Format a price with thousands separators, e.g. `63,412.50`.
pub fn format_price(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let negative = int_part.starts_with('-');
    let digits = int_part.trim_start_matches('-');

    let mut out = String::with_capacity(formatted.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn time_label(ts_ms: i64, granularity: Granularity) -> String {
    let Some(dt) = chrono::DateTime::from_timestamp_millis(ts_ms) else {
        return String::new();
    };
    match granularity {
        Granularity::D1 => dt.format("%b %d %H:%M").to_string(),
        _ => dt.format("%H:%M").to_string(),
    }
}
