use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::routes::RouteTable;
use super::state::{RotationState, Transition};

/// Timing knobs for the rotation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationConfig {
    pub tick_interval_ms: u64,
    /// Full traversals of the page list before the interstitial shows.
    pub cycle_threshold: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            cycle_threshold: 3,
        }
    }
}

/// Published on every page transition the ticker (or a navigation call)
/// causes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RotationEvent {
    PageChanged { index: usize, path: String },
    ExtraStarted { path: String },
    ExtraFinished,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationSnapshot {
    pub state: RotationState,
    pub current_path: String,
}

/// Drives the kiosk's page sequence on a fixed-interval ticker.
///
/// Rotation state only changes inside the ticker task or under the state
/// lock, so no operation here can fail; the rotator is independent of the
/// data layer. Cloning shares the same rotation.
#[derive(Clone)]
pub struct PageRotator {
    inner: Arc<RotatorInner>,
}

struct RotatorInner {
    state: Mutex<RotationState>,
    routes: RouteTable,
    config: RotationConfig,
    events: broadcast::Sender<RotationEvent>,
    ticker: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl PageRotator {
    pub fn new(routes: RouteTable, config: RotationConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(RotatorInner {
                state: Mutex::new(RotationState::new()),
                routes,
                config,
                events,
                ticker: Mutex::new(None),
            }),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn events(&self) -> broadcast::Receiver<RotationEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> RotationSnapshot {
        let state = self.inner.state.lock().await.clone();
        let current_path = self.inner.path_for(&state);
        RotationSnapshot {
            state,
            current_path,
        }
    }

    /// Spawn the tick loop. An already-running ticker is replaced.
    pub async fn start(&self) {
        let mut guard = self.inner.ticker.lock().await;
        if let Some((cancel, handle)) = guard.take() {
            cancel.cancel();
            handle.abort();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            let mut interval =
                time::interval(Duration::from_millis(inner.config.tick_interval_ms.max(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("rotation ticker shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let transition = {
                            let mut state = inner.state.lock().await;
                            state.tick(
                                &inner.routes,
                                inner.config.tick_interval_ms,
                                inner.config.cycle_threshold,
                            )
                        };
                        if let Some(transition) = transition {
                            inner.publish_transition(transition);
                        }
                    }
                }
            }
        });

        *guard = Some((cancel, handle));
    }

    pub async fn stop(&self) {
        if let Some((cancel, handle)) = self.inner.ticker.lock().await.take() {
            cancel.cancel();
            if let Err(err) = handle.await {
                warn!("rotation ticker failed to join: {err}");
            }
        }
    }

    /// Returns the new playing flag.
    pub async fn toggle_play_pause(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        state.toggle_play_pause();
        state.playing
    }

    /// External navigation by path; unknown paths are ignored. Returns
    /// whether the path resolved.
    pub async fn navigate_to(&self, path: &str) -> bool {
        let index = {
            let mut state = self.inner.state.lock().await;
            if !state.navigate(&self.inner.routes, path) {
                return false;
            }
            state.current_index
        };
        self.inner.publish(RotationEvent::PageChanged {
            index,
            path: path.to_string(),
        });
        true
    }
}

impl RotatorInner {
    fn path_for(&self, state: &RotationState) -> String {
        if state.showing_extra {
            self.routes.extra().path.clone()
        } else {
            self.routes
                .get(state.current_index)
                .map(|route| route.path.clone())
                .unwrap_or_default()
        }
    }

    fn publish_transition(&self, transition: Transition) {
        match transition {
            Transition::Advanced { index } => {
                let path = self
                    .routes
                    .get(index)
                    .map(|route| route.path.clone())
                    .unwrap_or_default();
                self.publish(RotationEvent::PageChanged { index, path });
            }
            Transition::ExtraStarted => {
                self.publish(RotationEvent::ExtraStarted {
                    path: self.routes.extra().path.clone(),
                });
            }
            Transition::ExtraFinished => {
                self.publish(RotationEvent::ExtraFinished);
                let path = self
                    .routes
                    .get(0)
                    .map(|route| route.path.clone())
                    .unwrap_or_default();
                self.publish(RotationEvent::PageChanged { index: 0, path });
            }
        }
    }

    fn publish(&self, event: RotationEvent) {
        // Nobody listening is fine; events are advisory.
        let _ = self.events.send(event);
    }
}
