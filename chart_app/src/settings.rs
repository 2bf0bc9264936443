use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chart_core::Granularity;
use directories::ProjectDirs;

#[derive(Clone, Debug)]
pub struct Settings {
    pub symbol: String,
    pub granularity: Granularity,
    /// Live retention of the chart series.
    pub capacity: usize,
    /// Seconds between price refreshes.
    pub refresh_secs: u64,
    /// Seconds between full history resyncs.
    pub resync_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            granularity: Granularity::H1,
            capacity: 30,
            refresh_secs: 15,
            resync_secs: 300,
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_secs.max(1))
    }
}

pub struct SettingsManager {
    base_dir: PathBuf,
    cfg_path: PathBuf,
    state: Settings,
}

impl SettingsManager {
    pub fn new(base_dir: PathBuf) -> Self {
        let cfg_path = base_dir.join("settings.conf");
        let mut mgr = Self {
            base_dir,
            cfg_path,
            state: Settings::default(),
        };
        mgr.load_from_disk();
        mgr
    }

    /// Manager rooted at the platform config dir, falling back to the
    /// working directory when none is available.
    pub fn load_default() -> Self {
        let base = ProjectDirs::from("", "", "chart_app")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base)
    }

    pub fn state(&self) -> Settings {
        self.state.clone()
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.state.granularity = granularity;
    }

    fn load_from_disk(&mut self) {
        let Ok(file) = File::open(&self.cfg_path) else {
            return;
        };
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "symbol" => {
                    if !value.is_empty() {
                        self.state.symbol = value.to_string();
                    }
                }
                "granularity" => self.state.granularity = Granularity::parse(value),
                "capacity" => {
                    if let Ok(v) = value.parse::<usize>() {
                        self.state.capacity = v.max(1);
                    }
                }
                "refresh_secs" => {
                    if let Ok(v) = value.parse::<u64>() {
                        self.state.refresh_secs = v.max(1);
                    }
                }
                "resync_secs" => {
                    if let Ok(v) = value.parse::<u64>() {
                        self.state.resync_secs = v.max(1);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        create_dir_all(&self.base_dir)
            .with_context(|| format!("unable to create {:?}", self.base_dir))?;
        let mut f = File::create(&self.cfg_path)
            .with_context(|| format!("unable to write {:?}", self.cfg_path))?;
        writeln!(f, "symbol={}", self.state.symbol)?;
        writeln!(f, "granularity={}", self.state.granularity.api_code())?;
        writeln!(f, "capacity={}", self.state.capacity)?;
        writeln!(f, "refresh_secs={}", self.state.refresh_secs)?;
        writeln!(f, "resync_secs={}", self.state.resync_secs)?;
        Ok(())
    }
}
