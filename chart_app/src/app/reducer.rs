use chart_core::ChartSeries;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::event::{AppEvent, FeedEvent, TimerEvent, UiEvent};
use super::state::AppState;

/// Apply one event to the state. Returns true when something visible
/// changed. Side effects (fetches) never happen here; the reducer only
/// records that a resync is wanted and the runtime issues the command.
pub fn reduce(state: &mut AppState, ev: AppEvent) -> bool {
    match ev {
        AppEvent::Ui(ev) => reduce_ui(state, ev),
        AppEvent::Feed(ev) => reduce_feed(state, ev),
        AppEvent::Timer(TimerEvent::Tick1s { now_ms }) => {
            state.clock = clock_label(now_ms);
            true
        }
    }
}

fn reduce_ui(state: &mut AppState, ev: UiEvent) -> bool {
    match ev {
        UiEvent::GranularitySelected { granularity } => {
            if granularity == state.granularity() {
                return false;
            }
            // Drop the old series outright so stale buckets never show under
            // the new granularity while the fetch is in flight.
            state.series = ChartSeries::with_capacity(granularity, state.series.capacity());
            state.loading = true;
            state.status = format!("Loading {} candles…", granularity.label());
            state.request_resync(granularity);
            true
        }
        UiEvent::GranularityCycled => {
            let next = state.granularity().next();
            reduce_ui(state, UiEvent::GranularitySelected { granularity: next })
        }
        UiEvent::ForceResync => {
            state.loading = true;
            state.status = "Refreshing…".to_string();
            state.request_resync(state.granularity());
            true
        }
        UiEvent::CursorMoved { column, row } => {
            let pos = Some((column, row));
            if state.cursor == pos {
                return false;
            }
            state.cursor = pos;
            true
        }
        UiEvent::CursorLeft => {
            if state.cursor.is_none() {
                return false;
            }
            state.cursor = None;
            true
        }
    }
}

fn reduce_feed(state: &mut AppState, ev: FeedEvent) -> bool {
    match ev {
        FeedEvent::History {
            generation,
            granularity,
            candles,
            origin,
        } => {
            if !state.tracker.is_current(generation) || granularity != state.granularity() {
                debug!(
                    generation,
                    ?granularity,
                    "dropping stale history batch"
                );
                return false;
            }
            state.last_price = candles.last().map(|c| c.close).unwrap_or(state.last_price);
            state.series.replace_all(granularity, candles);
            state.origin = origin;
            state.loading = false;
            state.last_updated_ms = Some(chart_core::now_ms());
            state.status = match origin {
                chart_core::DataOrigin::Live => format!("Synced {} history", granularity.label()),
                chart_core::DataOrigin::Synthetic => {
                    "Market data unavailable, showing simulated candles".to_string()
                }
            };
            true
        }
        FeedEvent::Price { ts_ms, price } => {
            if state.series.apply_tick(ts_ms, price).is_none() {
                return false;
            }
            state.last_price = price;
            state.last_updated_ms = Some(ts_ms);
            true
        }
        FeedEvent::Failed { context } => {
            state.status = context;
            true
        }
    }
}

fn clock_label(now_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(now_ms)
        .map(|dt| dt.format("%H:%M:%S UTC").to_string())
        .unwrap_or_default()
}
