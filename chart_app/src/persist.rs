// Best-effort series snapshot so a relaunch can show candles immediately
// instead of an empty chart while the first fetch runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chart_core::{Candle, Granularity};
use serde::{Deserialize, Serialize};
use tracing::warn;

const SNAPSHOT_FILE: &str = "snapshot.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub symbol: String,
    pub granularity: Granularity,
    pub candles: Vec<Candle>,
}

pub fn snapshot_path(base_dir: &Path) -> PathBuf {
    base_dir.join(SNAPSHOT_FILE)
}

/// Load a snapshot if one exists and matches the configured symbol and
/// granularity. Anything unreadable is treated as no snapshot.
pub fn load_snapshot(path: &Path, symbol: &str, granularity: Granularity) -> Vec<Candle> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str::<SeriesSnapshot>(&raw) {
        Ok(snap) if snap.symbol == symbol && snap.granularity == granularity => snap.candles,
        Ok(_) => Vec::new(),
        Err(err) => {
            warn!(%err, "ignoring unreadable series snapshot");
            Vec::new()
        }
    }
}

pub fn save_snapshot(path: &Path, snapshot: &SeriesSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {parent:?}"))?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json).with_context(|| format!("unable to write {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "chart_app-snapshot-{tag}-{}.json",
            std::process::id()
        ))
    }

    fn mk_snapshot() -> SeriesSnapshot {
        SeriesSnapshot {
            symbol: "BTCUSDT".to_string(),
            granularity: Granularity::H1,
            candles: vec![
                Candle {
                    ts_ms: 1_700_000_000_000,
                    open: 100.0,
                    high: 110.0,
                    low: 95.0,
                    close: 105.0,
                },
                Candle {
                    ts_ms: 1_700_003_600_000,
                    open: 105.0,
                    high: 112.0,
                    low: 104.0,
                    close: 111.0,
                },
            ],
        }
    }

    #[test]
    fn snapshot_round_trips() {
        let path = temp_path("roundtrip");
        let snap = mk_snapshot();
        save_snapshot(&path, &snap).unwrap();

        let candles = load_snapshot(&path, "BTCUSDT", Granularity::H1);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 111.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn mismatched_snapshot_is_ignored() {
        let path = temp_path("mismatch");
        save_snapshot(&path, &mk_snapshot()).unwrap();

        assert!(load_snapshot(&path, "ETHUSDT", Granularity::H1).is_empty());
        assert!(load_snapshot(&path, "BTCUSDT", Granularity::H4).is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unreadable_snapshot_is_no_snapshot() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_snapshot(&path, "BTCUSDT", Granularity::H1).is_empty());
        assert!(load_snapshot(Path::new("/nonexistent/snapshot.json"), "BTCUSDT", Granularity::H1)
            .is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
