use chart_core::{Candle, ChartSeries, DataOrigin, Granularity, RefreshTracker};

use crate::settings::Settings;

/// Everything one chart instance owns. There is deliberately no ambient
/// chart state anywhere else: a second chart would simply be a second
/// `AppState` with its own series and viewport.
#[derive(Debug, Clone)]
pub struct AppState {
    pub symbol: String,
    pub series: ChartSeries,
    pub origin: DataOrigin,
    pub loading: bool,
    pub status: String,
    pub cursor: Option<(u16, u16)>,
    pub last_price: f64,
    pub last_updated_ms: Option<i64>,
    pub clock: String,

    pub tracker: RefreshTracker,
    pending_resync: Option<(u64, Granularity)>,
}

impl AppState {
    /// Fresh state, optionally seeded with a cached series so the chart is
    /// not blank before the first fetch lands. The initial resync runs under
    /// generation zero.
    pub fn new(settings: &Settings, cached: Vec<Candle>) -> Self {
        let mut series = ChartSeries::with_capacity(settings.granularity, settings.capacity);
        let (status, last_price) = if cached.is_empty() {
            ("Connecting to market data…".to_string(), 0.0)
        } else {
            let last = cached.last().map(|c| c.close).unwrap_or(0.0);
            series.replace_all(settings.granularity, cached);
            ("Showing cached candles while syncing…".to_string(), last)
        };

        Self {
            symbol: settings.symbol.clone(),
            series,
            origin: DataOrigin::Synthetic,
            loading: true,
            status,
            cursor: None,
            last_price,
            last_updated_ms: None,
            clock: String::new(),
            tracker: RefreshTracker::new(),
            pending_resync: Some((0, settings.granularity)),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.series.granularity()
    }

    pub fn request_resync(&mut self, granularity: Granularity) {
        let generation = self.tracker.begin_resync();
        self.pending_resync = Some((generation, granularity));
    }

    /// Drained by the runtime loop and turned into a feed command.
    pub fn take_resync_request(&mut self) -> Option<(u64, Granularity)> {
        self.pending_resync.take()
    }

    /// Percent change of the latest close against the previous candle.
    pub fn change_percent(&self) -> f64 {
        let candles = self.series.candles();
        if candles.len() < 2 {
            return 0.0;
        }
        let prev = candles[candles.len() - 2].close;
        if prev == 0.0 {
            return 0.0;
        }
        (candles[candles.len() - 1].close - prev) / prev * 100.0
    }
}
