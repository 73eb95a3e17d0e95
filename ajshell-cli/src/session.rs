//! Session backed by the running process.

use std::collections::BTreeMap;
use std::ffi::CStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{info, warn};

use ajshell_core::config::ShellConfig;
use ajshell_core::error::SessionError;
use ajshell_core::model::{Identity, MachineInfo, ShellIdentity};
use ajshell_core::session::{SessionClock, SessionProvider};

pub struct LocalSession {
    name: Option<String>,
    color: Option<String>,
    allow_sudo: bool,
    clock: Mutex<SessionClock>,
    elevation_requested: AtomicBool,
    logged_out: AtomicBool,
}

impl LocalSession {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            name: config.name.clone(),
            color: config.color.clone(),
            allow_sudo: config.auth.allow_sudo,
            clock: Mutex::new(SessionClock::from_config(config, SystemTime::now())),
            elevation_requested: AtomicBool::new(false),
            logged_out: AtomicBool::new(false),
        }
    }

    /// Extend the session after user activity.
    pub fn touch(&self) {
        if let Ok(mut clock) = self.clock.lock() {
            clock.touch(SystemTime::now());
        }
    }

    pub fn elevation_requested(&self) -> bool {
        self.elevation_requested.load(Ordering::SeqCst)
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for LocalSession {
    async fn identity(&self) -> Result<ShellIdentity, SessionError> {
        if self.is_logged_out() {
            return Err(SessionError::NoSession);
        }
        // SAFETY: getuid/geteuid cannot fail and touch no memory.
        let (uid, effective) = unsafe { (libc::getuid(), libc::geteuid()) };
        let hostname = hostname().map_err(|e| SessionError::Unavailable(e.to_string()))?;
        Ok(ShellIdentity {
            identity: Identity {
                user: user_name(effective),
                uid,
                effective,
                elevation_allowed: self.allow_sudo,
                profile: BTreeMap::new(),
            },
            machine: MachineInfo {
                name: self.name.clone().unwrap_or_else(|| hostname.clone()),
                hostname,
            },
            color: self.color.clone(),
        })
    }

    async fn seconds_remaining(&self) -> Result<i64, SessionError> {
        if self.is_logged_out() {
            return Err(SessionError::NoSession);
        }
        let clock = self
            .clock
            .lock()
            .map_err(|_| SessionError::Unavailable("session clock poisoned".into()))?;
        Ok(clock.remaining())
    }

    fn elevate(&self) {
        if !self.allow_sudo {
            warn!("elevation requested but auth.allow_sudo is off");
            return;
        }
        info!("elevation requested");
        self.elevation_requested.store(true, Ordering::SeqCst);
    }

    fn logout(&self) {
        info!("logout");
        self.logged_out.store(true, Ordering::SeqCst);
    }
}

fn hostname() -> std::io::Result<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for its full length.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn user_name(uid: libc::uid_t) -> Option<String> {
    // SAFETY: getpwuid returns null or a pointer to static storage, read at once.
    unsafe {
        let pw = libc::getpwuid(uid);
        if pw.is_null() || (*pw).pw_name.is_null() {
            return std::env::var("USER").ok();
        }
        Some(CStr::from_ptr((*pw).pw_name).to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_reflects_process() {
        let mut config = ShellConfig::default();
        config.name = Some("web-01".into());
        config.auth.allow_sudo = true;
        let session = LocalSession::new(&config);

        let id = session.identity().await.unwrap();
        assert_eq!(id.identity.uid, unsafe { libc::getuid() });
        assert_eq!(id.machine.name, "web-01");
        assert!(!id.machine.hostname.is_empty());
        assert!(id.identity.elevation_allowed);
    }

    #[tokio::test]
    async fn test_fresh_session_has_full_lifetime() {
        let session = LocalSession::new(&ShellConfig::default());
        let remaining = session.seconds_remaining().await.unwrap();
        assert!((3598..=3600).contains(&remaining));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let session = LocalSession::new(&ShellConfig::default());
        session.logout();
        assert_eq!(
            session.seconds_remaining().await,
            Err(SessionError::NoSession)
        );
        assert!(session.identity().await.is_err());
    }

    #[test]
    fn test_elevate_requires_sudo_permission() {
        let session = LocalSession::new(&ShellConfig::default());
        session.elevate();
        assert!(!session.elevation_requested());

        let mut config = ShellConfig::default();
        config.auth.allow_sudo = true;
        let session = LocalSession::new(&config);
        session.elevate();
        assert!(session.elevation_requested());
    }
}
