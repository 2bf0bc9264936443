use chart_core::{Candle, DataOrigin, Granularity};

#[derive(Debug, Clone)]
pub enum AppEvent {
    Ui(UiEvent),
    Feed(FeedEvent),
    Timer(TimerEvent),
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    GranularitySelected { granularity: Granularity },
    GranularityCycled,
    ForceResync,
    CursorMoved { column: u16, row: u16 },
    CursorLeft,
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A full history batch. Stale generations are dropped by the reducer.
    History {
        generation: u64,
        granularity: Granularity,
        candles: Vec<Candle>,
        origin: DataOrigin,
    },
    Price {
        ts_ms: i64,
        price: f64,
    },
    Failed {
        context: String,
    },
}

#[derive(Debug, Clone)]
pub enum TimerEvent {
    Tick1s { now_ms: i64 },
}
