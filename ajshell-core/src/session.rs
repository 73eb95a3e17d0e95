use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::config::ShellConfig;
use crate::error::SessionError;
use crate::model::ShellIdentity;

/// Remaining time reported while dev autologin is on (one day).
pub const DEV_AUTOLOGIN_SECS: i64 = 86_400;

/// Identity/session collaborator.
///
/// `elevate` and `logout` are fire-and-forget; the shell does not wait on
/// or inspect their outcome.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn identity(&self) -> Result<ShellIdentity, SessionError>;

    /// Seconds until the session expires. Negative once expired.
    async fn seconds_remaining(&self) -> Result<i64, SessionError>;

    fn elevate(&self);

    fn logout(&self);
}

/// Session expiry bookkeeping: last activity plus the configured lifetime.
#[derive(Clone, Debug)]
pub struct SessionClock {
    timestamp: SystemTime,
    max_time: u64,
    autologin: bool,
}

impl SessionClock {
    pub fn new(timestamp: SystemTime, max_time: u64, autologin: bool) -> Self {
        Self {
            timestamp,
            max_time: if max_time == 0 { 3600 } else { max_time },
            autologin,
        }
    }

    pub fn from_config(config: &ShellConfig, now: SystemTime) -> Self {
        Self::new(now, config.session_max_time(), config.dev_autologin)
    }

    /// Record user activity, extending the session.
    pub fn touch(&mut self, now: SystemTime) {
        self.timestamp = now;
    }

    pub fn remaining_at(&self, now: SystemTime) -> i64 {
        if self.autologin {
            return DEV_AUTOLOGIN_SECS;
        }
        let started = unix_secs(self.timestamp);
        started + self.max_time as i64 - unix_secs(now)
    }

    pub fn remaining(&self) -> i64 {
        self.remaining_at(SystemTime::now())
    }
}

fn unix_secs(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
