//! Session expiry countdown shown in the header.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::reducer::{EventBus, ShellEvent};

/// The countdown is only shown during the last half hour of a session.
pub const WARN_BELOW_SECS: i64 = 1800;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn label(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Derive the visible countdown, or `None` when it should be hidden.
pub fn tick(seconds_remaining: i64) -> Option<Countdown> {
    if !(0..WARN_BELOW_SECS).contains(&seconds_remaining) {
        return None;
    }
    Some(Countdown {
        hours: seconds_remaining / 3600,
        minutes: seconds_remaining % 3600 / 60,
        seconds: seconds_remaining % 60,
    })
}

/// Background task publishing one `SessionTick` per second.
///
/// The task is aborted when the ticker is stopped or dropped.
pub struct CountdownTicker {
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn(initial: i64, bus: EventBus) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            let mut remaining = initial;
            loop {
                interval.tick().await;
                if remaining < 0 {
                    info!("session expired");
                    bus.emit(ShellEvent::SessionExpired);
                    break;
                }
                bus.emit(ShellEvent::SessionTick {
                    seconds_remaining: remaining,
                });
                remaining -= 1;
            }
            debug!("countdown ticker finished");
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
