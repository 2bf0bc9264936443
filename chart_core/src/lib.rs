pub mod candle;
pub mod layout;
pub mod market;
pub mod refresh;
pub mod series;
pub mod synthetic;

pub use candle::{now_ms, Candle, Granularity};
pub use layout::{candle_at_x, format_price, CandleShape, GridLine, Layout, PriceMarker, TimeMark};
pub use market::{DataOrigin, FeedError, MarketClient};
pub use refresh::RefreshTracker;
pub use series::{ChartSeries, SeriesUpdate};
