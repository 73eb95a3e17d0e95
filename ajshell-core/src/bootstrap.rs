//! Bootstrap state machine.
//!
//! Nothing interactive runs until bootstrap resolves. The sequence is strictly
//! ordered (configuration, identity, plugins, routes) and every step is awaited
//! before the next begins. Optional plugins that fail are recorded and
//! skipped; anything else that fails halts the shell for good. Nothing is
//! retried: once a step has partially initialised the shell, only a restart
//! is safe.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::catalog::{Catalog, flatten, merge_sidebar};
use crate::config::{ConfigSource, ShellConfig};
use crate::error::BootstrapError;
use crate::i18n::{Translate, Translations, Untranslated};
use crate::model::{PluginId, ShellIdentity, SidebarItem};
use crate::plugin::{PluginContext, PluginContribution, PluginManager, register_plugin};
use crate::reducer::{EventBus, ShellEvent};
use crate::routes::RouteTable;
use crate::session::SessionProvider;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum BootstrapState {
    #[default]
    Loading,
    /// Still loading, with optional plugins that failed to register.
    PluginRecovered { plugins: Vec<PluginId> },
    Ready,
    FatalError { diagnostic: String },
}

impl BootstrapState {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            BootstrapState::Loading | BootstrapState::PluginRecovered { .. }
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapState::Ready)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BootstrapState::FatalError { .. })
    }

    /// Transitions only move forward. `Ready` and `FatalError` are terminal.
    pub fn can_transition_to(&self, next: &BootstrapState) -> bool {
        match (self, next) {
            (BootstrapState::Ready | BootstrapState::FatalError { .. }, _) => false,
            (_, BootstrapState::Loading) => false,
            (BootstrapState::Loading | BootstrapState::PluginRecovered { .. }, _) => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BootstrapState::Loading => "loading",
            BootstrapState::PluginRecovered { .. } => "loading (plugin failed)",
            BootstrapState::Ready => "ready",
            BootstrapState::FatalError { .. } => "fatal error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapStep {
    Configuration,
    Identity,
    Plugins,
    Routes,
}

impl BootstrapStep {
    pub fn label(&self) -> &'static str {
        match self {
            BootstrapStep::Configuration => "Loading configuration",
            BootstrapStep::Identity => "Resolving identity",
            BootstrapStep::Plugins => "Registering plugins",
            BootstrapStep::Routes => "Building routes",
        }
    }
}

/// Result of one bootstrap step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Recoverable { plugin: PluginId, reason: String },
    Fatal { error: BootstrapError },
}

/// How many optional plugins may fail before bootstrap gives up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PluginFailurePolicy {
    pub tolerated: usize,
}

impl Default for PluginFailurePolicy {
    fn default() -> Self {
        Self { tolerated: 1 }
    }
}

/// Everything the shell needs once bootstrap succeeded
#[derive(Clone, Debug)]
pub struct ShellSession {
    pub config: Arc<ShellConfig>,
    pub identity: ShellIdentity,
    pub sidebar: Vec<SidebarItem>,
    pub catalog: Catalog,
    pub routes: RouteTable,
    pub failed_plugins: Vec<PluginId>,
    pub translator: Arc<dyn Translate>,
}

impl ShellSession {
    /// Landing destination: the first catalog entry.
    pub fn home_url(&self) -> Option<String> {
        self.catalog.entries.first().map(|r| self.catalog.href(r))
    }
}

#[derive(Default)]
pub struct Bootstrap {
    state: BootstrapState,
    started: bool,
    failed_plugins: Vec<PluginId>,
    completed: Vec<BootstrapStep>,
    policy: Option<PluginFailurePolicy>,
    bus: Option<EventBus>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish progress on `bus`.
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Override the policy from configuration.
    pub fn with_policy(mut self, policy: PluginFailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    pub fn failed_plugins(&self) -> &[PluginId] {
        &self.failed_plugins
    }

    /// Steps that finished, in order.
    pub fn completed_steps(&self) -> &[BootstrapStep] {
        &self.completed
    }

    /// Run the bootstrap sequence.
    ///
    /// Returns `Ok(None)` without doing anything if bootstrap already ran.
    pub async fn begin(
        &mut self,
        config_source: &dyn ConfigSource,
        session: &dyn SessionProvider,
        plugins: &PluginManager,
    ) -> Result<Option<ShellSession>, BootstrapError> {
        if self.started || !self.state.is_loading() {
            return Ok(None);
        }
        self.started = true;
        info!("bootstrap started");

        self.enter(BootstrapStep::Configuration);
        let config = match config_source.load().await {
            Ok(config) => Arc::new(config),
            Err(e) => return Err(self.fail(e.into())),
        };
        let translator = load_translator(&config);
        self.complete(BootstrapStep::Configuration);

        self.enter(BootstrapStep::Identity);
        let identity = match session.identity().await {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.complete(BootstrapStep::Identity);

        self.enter(BootstrapStep::Plugins);
        let policy = self.policy.unwrap_or(PluginFailurePolicy {
            tolerated: config.bootstrap.tolerated_plugin_failures,
        });
        let mut contributions: Vec<(PluginId, PluginContribution)> = Vec::new();
        for plugin in plugins.iter() {
            if !plugin.is_core() && config.is_plugin_disabled(plugin.id()) {
                info!(plugin = plugin.id(), "plugin disabled by configuration");
                continue;
            }
            let ctx = PluginContext {
                plugin_id: plugin.id().to_string(),
                config: config.clone(),
                identity: identity.clone(),
            };
            let registration = register_plugin(plugin, &ctx).await;
            match registration.outcome {
                StepOutcome::Success => {
                    let contribution = registration.contribution.unwrap_or_default();
                    contributions.push((registration.plugin_id, contribution));
                }
                StepOutcome::Recoverable { plugin, reason } => {
                    self.on_plugin_failed(&plugin, &reason);
                }
                StepOutcome::Fatal { error } => return Err(self.fail(error)),
            }
        }
        if self.failed_plugins.len() > policy.tolerated {
            return Err(self.fail(BootstrapError::TooManyPluginFailures {
                failed: self.failed_plugins.clone(),
                tolerated: policy.tolerated,
            }));
        }
        self.complete(BootstrapStep::Plugins);

        self.enter(BootstrapStep::Routes);
        let routes = match RouteTable::build(&contributions, translator.as_ref()) {
            Ok(routes) => routes,
            Err(e) => return Err(self.fail(e.into())),
        };
        let sidebar = merge_sidebar(contributions.into_iter().flat_map(|(_, c)| c.sidebar));
        let catalog = Catalog::new(
            flatten(&sidebar, translator.as_ref()),
            config.url_prefix.clone(),
        );
        self.complete(BootstrapStep::Routes);

        let shell = ShellSession {
            config,
            identity,
            sidebar,
            catalog,
            routes,
            failed_plugins: self.failed_plugins.clone(),
            translator,
        };
        self.emit(ShellEvent::SessionLoaded {
            session: Box::new(shell.clone()),
        });
        self.mark_ready();
        Ok(Some(shell))
    }

    /// Enter the terminal failure state. The diagnostic goes to the log; the
    /// host renders the blocking error surface.
    pub fn on_fatal_error(&mut self, diagnostic: impl Into<String>) {
        let diagnostic = diagnostic.into();
        let next = BootstrapState::FatalError {
            diagnostic: diagnostic.clone(),
        };
        if !self.state.can_transition_to(&next) {
            return;
        }
        error!(diagnostic = %diagnostic, "bootstrap failed");
        self.transition(next);
    }

    /// Record an optional plugin failure; bootstrap carries on.
    pub fn on_plugin_failed(&mut self, name: &str, reason: &str) {
        if !self.state.is_loading() {
            return;
        }
        warn!(plugin = name, reason, "continuing without plugin");
        self.failed_plugins.push(name.to_string());
        self.emit(ShellEvent::PluginFailed {
            plugin: name.to_string(),
            reason: reason.to_string(),
        });
        self.transition(BootstrapState::PluginRecovered {
            plugins: self.failed_plugins.clone(),
        });
    }

    /// Finish loading. Returns false if the machine can no longer become ready.
    pub fn mark_ready(&mut self) -> bool {
        if !self.state.can_transition_to(&BootstrapState::Ready) {
            return false;
        }
        info!(failed_plugins = self.failed_plugins.len(), "shell ready");
        self.transition(BootstrapState::Ready);
        true
    }

    fn fail(&mut self, error: BootstrapError) -> BootstrapError {
        self.on_fatal_error(error.to_string());
        error
    }

    fn enter(&mut self, step: BootstrapStep) {
        info!(step = step.label(), "bootstrap step");
        self.emit(ShellEvent::BootstrapStep { step });
    }

    fn complete(&mut self, step: BootstrapStep) {
        self.completed.push(step);
    }

    fn transition(&mut self, next: BootstrapState) {
        self.state = next.clone();
        self.emit(ShellEvent::BootstrapChanged { state: next });
    }

    fn emit(&self, event: ShellEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }
}

/// Translations are a convenience: a broken file degrades to untranslated text.
fn load_translator(config: &ShellConfig) -> Arc<dyn Translate> {
    let Some(path) = &config.translations else {
        return Arc::new(Untranslated);
    };
    let path = config.resolve_path(path);
    match Translations::load(&path, &config.language) {
        Ok(tr) => {
            info!(language = %tr.language, entries = tr.len(), "translations loaded");
            Arc::new(tr)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "translations unavailable");
            Arc::new(Untranslated)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SessionError;
    use crate::model::{Identity, MachineInfo};
    use crate::plugin::testing::StubPlugin;

    struct FakeSession {
        fail: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeSession {
        fn ok() -> Self {
            Self {
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SessionProvider for FakeSession {
        async fn identity(&self) -> Result<ShellIdentity, SessionError> {
            self.calls.lock().unwrap().push("identity");
            if self.fail {
                return Err(SessionError::Unavailable("backend down".into()));
            }
            Ok(ShellIdentity {
                identity: Identity {
                    user: Some("alice".into()),
                    uid: 1000,
                    effective: 1000,
                    elevation_allowed: false,
                    profile: BTreeMap::new(),
                },
                machine: MachineInfo {
                    name: "box".into(),
                    hostname: "box".into(),
                },
                color: None,
            })
        }

        async fn seconds_remaining(&self) -> Result<i64, SessionError> {
            Ok(3600)
        }

        fn elevate(&self) {}

        fn logout(&self) {}
    }

    fn manager(plugins: Vec<StubPlugin>) -> PluginManager {
        PluginManager::with_plugins(
            plugins
                .into_iter()
                .map(|p| Box::new(p) as Box<dyn crate::plugin::ShellPlugin>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![
            StubPlugin::ok("core", "/view/dashboard").core(),
            StubPlugin::ok("terminal", "/view/terminal"),
        ]);
        let shell = boot
            .begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(boot.state(), &BootstrapState::Ready);
        assert_eq!(
            boot.completed_steps(),
            &[
                BootstrapStep::Configuration,
                BootstrapStep::Identity,
                BootstrapStep::Plugins,
                BootstrapStep::Routes,
            ]
        );
        assert_eq!(shell.catalog.len(), 2);
        assert_eq!(shell.routes.len(), 2);
        assert_eq!(shell.home_url().as_deref(), Some("/view/dashboard"));
        // both plugins contributed to the same "tools" category
        assert_eq!(shell.sidebar.len(), 1);
    }

    #[tokio::test]
    async fn test_single_plugin_failure_recovers_to_ready() {
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![
            StubPlugin::ok("core", "/view/dashboard").core(),
            StubPlugin::failing("services", "systemctl not found"),
            StubPlugin::ok("terminal", "/view/terminal"),
        ]);
        let shell = boot
            .begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(boot.state(), &BootstrapState::Ready);
        assert_eq!(boot.failed_plugins(), &["services".to_string()]);
        assert_eq!(shell.failed_plugins, vec!["services".to_string()]);
        // the plugin after the failing one still registered
        assert!(shell.routes.resolve("/view/terminal").is_some());
    }

    #[tokio::test]
    async fn test_second_plugin_failure_escalates() {
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![
            StubPlugin::failing("services", "no systemd"),
            StubPlugin::failing("packages", "no apt"),
            StubPlugin::ok("terminal", "/view/terminal"),
        ]);
        let err = boot
            .begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BootstrapError::TooManyPluginFailures {
                failed: vec!["services".into(), "packages".into()],
                tolerated: 1,
            }
        );
        assert!(boot.state().is_fatal());
    }

    #[tokio::test]
    async fn test_policy_can_tolerate_more() {
        let mut boot = Bootstrap::new().with_policy(PluginFailurePolicy { tolerated: 2 });
        let plugins = manager(vec![
            StubPlugin::failing("services", "no systemd"),
            StubPlugin::failing("packages", "no apt"),
        ]);
        let result = boot
            .begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await;
        assert!(result.is_ok());
        assert_eq!(boot.state(), &BootstrapState::Ready);
        assert_eq!(boot.failed_plugins().len(), 2);
    }

    #[tokio::test]
    async fn test_core_failure_after_plugin_failure_is_fatal() {
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![
            StubPlugin::failing("services", "no systemd"),
            StubPlugin::failing("core", "settings store corrupt").core(),
            StubPlugin::ok("terminal", "/view/terminal"),
        ]);
        let err = boot
            .begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::CorePlugin { .. }));
        assert!(boot.state().is_fatal());
        assert!(!boot.completed_steps().contains(&BootstrapStep::Plugins));
    }

    #[tokio::test]
    async fn test_identity_failure_stops_before_plugins() {
        let mut boot = Bootstrap::new();
        let session = FakeSession::failing();
        let plugins = manager(vec![StubPlugin::ok("terminal", "/view/terminal")]);
        let err = boot
            .begin(&ShellConfig::default(), &session, &plugins)
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Identity(_)));
        assert_eq!(boot.completed_steps(), &[BootstrapStep::Configuration]);
        assert_eq!(*session.calls.lock().unwrap(), vec!["identity"]);
    }

    #[tokio::test]
    async fn test_route_conflict_is_fatal() {
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![
            StubPlugin::ok("a", "/view/same"),
            StubPlugin::ok("b", "/view/same"),
        ]);
        let err = boot
            .begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Routes(_)));
    }

    #[tokio::test]
    async fn test_disabled_plugin_is_skipped() {
        let mut config = ShellConfig::default();
        config.plugins.disabled = vec!["services".into()];
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![
            StubPlugin::failing("services", "would fail"),
            StubPlugin::ok("terminal", "/view/terminal"),
        ]);
        boot.begin(&config, &FakeSession::ok(), &plugins)
            .await
            .unwrap();
        assert!(boot.failed_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_begin_is_idempotent() {
        let mut boot = Bootstrap::new();
        let plugins = manager(vec![StubPlugin::ok("terminal", "/view/terminal")]);
        let session = FakeSession::ok();
        assert!(
            boot.begin(&ShellConfig::default(), &session, &plugins)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            boot.begin(&ShellConfig::default(), &session, &plugins)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(session.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fatal_is_terminal() {
        let mut boot = Bootstrap::new();
        boot.on_fatal_error("boom");
        assert!(!boot.mark_ready());
        boot.on_plugin_failed("late", "ignored");
        assert_eq!(
            boot.state(),
            &BootstrapState::FatalError {
                diagnostic: "boom".into()
            }
        );
        assert!(boot.failed_plugins().is_empty());
    }

    #[test]
    fn test_ready_does_not_fall_back() {
        let mut boot = Bootstrap::new();
        assert!(boot.mark_ready());
        boot.on_fatal_error("late");
        assert!(boot.state().is_ready());
        assert!(!BootstrapState::Ready.can_transition_to(&BootstrapState::Loading));
    }

    #[tokio::test]
    async fn test_progress_is_published() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut boot = Bootstrap::new().with_events(bus);
        let plugins = manager(vec![
            StubPlugin::failing("services", "no systemd"),
            StubPlugin::ok("terminal", "/view/terminal"),
        ]);
        boot.begin(&ShellConfig::default(), &FakeSession::ok(), &plugins)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(env) = rx.try_recv() {
            events.push(env.event);
        }
        let steps: Vec<BootstrapStep> = events
            .iter()
            .filter_map(|e| match e {
                ShellEvent::BootstrapStep { step } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(steps.len(), 4);
        assert!(events.iter().any(|e| matches!(
            e,
            ShellEvent::PluginFailed { plugin, .. } if plugin == "services"
        )));
        assert!(matches!(
            events.last(),
            Some(ShellEvent::BootstrapChanged {
                state: BootstrapState::Ready
            })
        ));
    }
}
