use serde::{Deserialize, Serialize};

use super::routes::RouteTable;

/// Externally visible result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the next page in sequence.
    Advanced { index: usize },
    /// The configured number of cycles completed; the interstitial starts.
    ExtraStarted,
    /// The interstitial finished; rotation restarts from the first page.
    ExtraFinished,
}

/// Where the rotation currently is and how far through the current page it
/// has gotten. `progress` is a percentage in `[0, 100]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RotationState {
    pub current_index: usize,
    pub progress: f64,
    pub cycle_count: u32,
    pub showing_extra: bool,
    pub playing: bool,
    /// Ticks spent on the current page; drives `progress` so that page
    /// boundaries land on exact tick counts.
    #[serde(skip)]
    ticks_in_page: u64,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            current_index: 0,
            progress: 0.0,
            cycle_count: 0,
            showing_extra: false,
            playing: true,
            ticks_in_page: 0,
        }
    }
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick of `tick_interval_ms`. Returns the transition the
    /// tick caused, if any. A no-op while paused.
    pub fn tick(
        &mut self,
        routes: &RouteTable,
        tick_interval_ms: u64,
        cycle_threshold: u32,
    ) -> Option<Transition> {
        if !self.playing || routes.is_empty() {
            return None;
        }

        let duration_secs = if self.showing_extra {
            routes.extra().duration_secs
        } else {
            routes
                .get(self.current_index)
                .map(|route| route.duration_secs)
                .unwrap_or(0)
        };
        let page_ticks = ticks_for(duration_secs, tick_interval_ms);

        self.ticks_in_page += 1;
        if self.ticks_in_page < page_ticks {
            self.progress = 100.0 * self.ticks_in_page as f64 / page_ticks as f64;
            return None;
        }

        self.reset_progress();

        if self.showing_extra {
            self.showing_extra = false;
            self.cycle_count = 0;
            self.current_index = 0;
            return Some(Transition::ExtraFinished);
        }

        let next = (self.current_index + 1) % routes.len();
        if next == 0 {
            self.cycle_count += 1;
            if self.cycle_count >= cycle_threshold {
                self.showing_extra = true;
                return Some(Transition::ExtraStarted);
            }
        }

        self.current_index = next;
        Some(Transition::Advanced { index: next })
    }

    /// External jump to the page at `path`. Progress restarts; cycle count
    /// and the interstitial flag are left alone. Unknown paths are ignored.
    pub fn navigate(&mut self, routes: &RouteTable, path: &str) -> bool {
        let Some(index) = routes.resolve(path) else {
            return false;
        };
        self.current_index = index;
        self.reset_progress();
        true
    }

    /// Flip play/pause. Pausing zeroes progress, so resuming restarts the
    /// current page from the top.
    pub fn toggle_play_pause(&mut self) {
        if self.playing {
            self.reset_progress();
        }
        self.playing = !self.playing;
    }

    fn reset_progress(&mut self) {
        self.progress = 0.0;
        self.ticks_in_page = 0;
    }
}

fn ticks_for(duration_secs: u64, tick_interval_ms: u64) -> u64 {
    let duration_ms = duration_secs.saturating_mul(1000);
    (duration_ms / tick_interval_ms.max(1)).max(1)
}
