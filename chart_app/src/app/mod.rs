pub mod event;
pub mod reducer;
pub mod render;
pub mod state;

pub use event::*;
pub use state::AppState;

use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::Terminal;

pub struct AppRuntime {
    pub state: AppState,
    dirty: bool,
    last_tick_secs: i64,
}

impl AppRuntime {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            dirty: true,
            last_tick_secs: 0,
        }
    }

    pub fn handle_event(&mut self, ev: AppEvent) {
        let changed = reducer::reduce(&mut self.state, ev);
        if changed {
            self.dirty = true;
        }
    }

    pub fn tick_if_needed(&mut self) {
        let now_ms = chart_core::now_ms();
        let now_secs = now_ms / 1_000;
        if now_secs != self.last_tick_secs {
            self.last_tick_secs = now_secs;
            self.handle_event(AppEvent::Timer(TimerEvent::Tick1s { now_ms }));
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn render_if_dirty<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        if self.dirty {
            terminal.draw(|frame| render::draw(frame, &self.state))?;
            self.dirty = false;
        }
        Ok(())
    }
}
