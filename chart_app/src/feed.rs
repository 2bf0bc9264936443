// Market feed task. Owns the HTTP client and the refresh/resync policy:
// a full history resync on start and on a fixed cadence, a cheap price
// refresh in between, and command-triggered resyncs that always win over
// whatever else is in flight.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chart_core::{now_ms, synthetic, Candle, DataOrigin, Granularity, MarketClient, RefreshTracker};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::app::{AppEvent, FeedEvent};
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub enum FeedCommand {
    Resync {
        generation: u64,
        granularity: Granularity,
    },
}

const COMMAND_POLL: Duration = Duration::from_millis(250);

pub async fn run_feed(
    settings: Settings,
    mut commands: UnboundedReceiver<FeedCommand>,
    tx: Sender<AppEvent>,
) {
    let client = MarketClient::new();
    let tracker = Arc::new(Mutex::new(RefreshTracker::new()));

    let mut granularity = settings.granularity;
    let mut generation: u64 = 0;
    let mut origin = DataOrigin::Synthetic;
    let mut last_close = synthetic::DEFAULT_BASE_PRICE;
    let mut last_refresh = Instant::now();
    let mut last_resync: Option<Instant> = None;

    loop {
        // Coalesce queued commands; only the newest resync matters.
        let mut requested: Option<(u64, Granularity)> = None;
        while let Ok(FeedCommand::Resync {
            generation: g,
            granularity: gr,
        }) = commands.try_recv()
        {
            requested = Some((g, gr));
        }

        // The startup resync arrives as a command; the periodic cadence only
        // starts counting after the first one completed.
        let due = last_resync
            .map(|t| t.elapsed() >= settings.resync_interval())
            .unwrap_or(false);
        if let Some((g, gr)) = requested {
            generation = g;
            granularity = gr;
            (origin, last_close) = resync(&client, &settings, generation, granularity, &tx).await;
            last_resync = Some(Instant::now());
            last_refresh = Instant::now();
        } else if due {
            // Periodic full resync runs under the current generation, so a
            // granularity switch racing it still wins in the reducer.
            (origin, last_close) = resync(&client, &settings, generation, granularity, &tx).await;
            last_resync = Some(Instant::now());
            last_refresh = Instant::now();
        } else if last_refresh.elapsed() >= settings.refresh_interval() {
            last_refresh = Instant::now();
            match origin {
                DataOrigin::Live => {
                    spawn_price_refresh(&client, &settings, tracker.clone(), tx.clone())
                }
                DataOrigin::Synthetic => {
                    // Offline: keep the chart moving with a simulated tick.
                    last_close = synthetic::walk_tick(&mut rand::thread_rng(), last_close);
                    let _ = tx.send(AppEvent::Feed(FeedEvent::Price {
                        ts_ms: now_ms(),
                        price: last_close,
                    }));
                }
            }
        }

        sleep(COMMAND_POLL).await;
    }
}

async fn resync(
    client: &MarketClient,
    settings: &Settings,
    generation: u64,
    granularity: Granularity,
    tx: &Sender<AppEvent>,
) -> (DataOrigin, f64) {
    let (candles, origin) = client
        .history_or_fallback(&settings.symbol, granularity, chart_core::market::HISTORY_LIMIT)
        .await;
    let last_close = candles
        .last()
        .map(|c: &Candle| c.close)
        .unwrap_or(synthetic::DEFAULT_BASE_PRICE);
    info!(
        symbol = %settings.symbol,
        granularity = granularity.label(),
        origin = origin.label(),
        count = candles.len(),
        "history resync complete"
    );
    let _ = tx.send(AppEvent::Feed(FeedEvent::History {
        generation,
        granularity,
        candles,
        origin,
    }));
    (origin, last_close)
}

/// Fire-and-forget price refresh. The tracker guarantees at most one is
/// outstanding; a tick that finds one in flight is simply skipped.
fn spawn_price_refresh(
    client: &MarketClient,
    settings: &Settings,
    tracker: Arc<Mutex<RefreshTracker>>,
    tx: Sender<AppEvent>,
) {
    {
        let mut guard = tracker.lock().expect("refresh tracker poisoned");
        if !guard.try_begin_refresh() {
            debug!("price refresh already in flight, skipping");
            return;
        }
    }

    let client = client.clone();
    let symbol = settings.symbol.clone();
    tokio::spawn(async move {
        match client.fetch_price(&symbol).await {
            Ok(price) => {
                let _ = tx.send(AppEvent::Feed(FeedEvent::Price {
                    ts_ms: now_ms(),
                    price,
                }));
            }
            Err(err) => {
                warn!(%symbol, %err, "price refresh failed");
                let _ = tx.send(AppEvent::Feed(FeedEvent::Failed {
                    context: format!("price refresh failed: {err}"),
                }));
            }
        }
        tracker.lock().expect("refresh tracker poisoned").finish_refresh();
    });
}
