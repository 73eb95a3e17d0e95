use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tokio::sync::broadcast;

use crate::bootstrap::{BootstrapState, BootstrapStep, ShellSession};
use crate::model::PluginId;
use crate::state::{AppState, PluginWarning};

#[derive(Clone, Debug)]
pub enum ShellEvent {
    BootstrapStep {
        step: BootstrapStep,
    },
    BootstrapChanged {
        state: BootstrapState,
    },
    PluginFailed {
        plugin: PluginId,
        reason: String,
    },
    SessionLoaded {
        session: Box<ShellSession>,
    },
    SessionTick {
        seconds_remaining: i64,
    },
    SessionExpired,
}

#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub id: u64,
    pub at: SystemTime,
    pub event: ShellEvent,
}

/// Broadcast sender plus a shared id counter.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn emit(&self, event: ShellEvent) {
        // No receivers is fine; events are only observed by a running UI.
        let _ = self.tx.send(EventEnvelope {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            at: SystemTime::now(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }
}

pub fn reduce(state: &mut AppState, env: &EventEnvelope) {
    state.last_event_id = env.id;

    match &env.event {
        ShellEvent::BootstrapStep { step } => {
            if state.bootstrap.is_loading() {
                state.current_step = Some(*step);
            }
        }
        ShellEvent::BootstrapChanged { state: next } => {
            if state.bootstrap.can_transition_to(next) {
                state.bootstrap = next.clone();
                state.app_ready = next.is_ready();
                if !next.is_loading() {
                    state.current_step = None;
                }
            }
        }
        ShellEvent::PluginFailed { plugin, reason } => {
            if state.bootstrap.is_loading() {
                state.plugin_warnings.push(PluginWarning {
                    plugin: plugin.clone(),
                    reason: reason.clone(),
                });
            }
        }
        ShellEvent::SessionLoaded { session } => {
            if state.current_url.is_none() {
                state.current_url = session.home_url();
            }
            state.session = Some((**session).clone());
        }
        ShellEvent::SessionTick { seconds_remaining } => {
            state.seconds_remaining = Some(*seconds_remaining);
        }
        ShellEvent::SessionExpired => {
            state.seconds_remaining = None;
            state.session_expired = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(id: u64, event: ShellEvent) -> EventEnvelope {
        EventEnvelope {
            id,
            at: SystemTime::now(),
            event,
        }
    }

    #[test]
    fn test_bootstrap_progress() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            &env(
                1,
                ShellEvent::BootstrapStep {
                    step: BootstrapStep::Plugins,
                },
            ),
        );
        assert_eq!(state.current_step, Some(BootstrapStep::Plugins));
        assert!(!state.app_ready);

        reduce(
            &mut state,
            &env(
                2,
                ShellEvent::BootstrapChanged {
                    state: BootstrapState::Ready,
                },
            ),
        );
        assert!(state.app_ready);
        assert_eq!(state.current_step, None);
        assert_eq!(state.last_event_id, 2);
    }

    #[test]
    fn test_state_never_moves_backwards() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            &env(
                1,
                ShellEvent::BootstrapChanged {
                    state: BootstrapState::FatalError {
                        diagnostic: "identity".into(),
                    },
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                2,
                ShellEvent::BootstrapChanged {
                    state: BootstrapState::Ready,
                },
            ),
        );
        assert!(state.bootstrap.is_fatal());
        assert!(!state.app_ready);
    }

    #[test]
    fn test_plugin_failure_becomes_warning() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            &env(
                1,
                ShellEvent::PluginFailed {
                    plugin: "services".into(),
                    reason: "no systemd".into(),
                },
            ),
        );
        assert_eq!(state.plugin_warnings.len(), 1);
        assert_eq!(state.plugin_warnings[0].plugin, "services");
    }

    #[test]
    fn test_ticks_and_expiry() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            &env(
                1,
                ShellEvent::SessionTick {
                    seconds_remaining: 1799,
                },
            ),
        );
        assert_eq!(state.countdown().map(|c| c.label()).as_deref(), Some("00:29:59"));

        reduce(&mut state, &env(2, ShellEvent::SessionExpired));
        assert!(state.session_expired);
        assert!(state.countdown().is_none());
    }

    #[tokio::test]
    async fn test_bus_assigns_increasing_ids() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(ShellEvent::SessionExpired);
        bus.emit(ShellEvent::SessionExpired);
        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new(1).emit(ShellEvent::SessionExpired);
    }
}
