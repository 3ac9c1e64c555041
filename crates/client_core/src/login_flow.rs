//! Reactive coordination behind the login screen.
//!
//! Three worker tasks consume the screen's input streams. The login and
//! remember-me tasks are straight pass-throughs. The username task runs
//! debounce, distinct-until-changed, the null/empty filters and a switch-latest
//! lookup. Every UI-visible output goes through the caller's [`UiDispatcher`].

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{stream::BoxStream, StreamExt};
use shared::domain::Username;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::LoginSettings,
    dispatch::UiDispatcher,
    pipeline::{Debounce, DistinctUntilChanged, SwitchLatest},
    services::{AuthService, EnvironmentLookup, LookupError},
};

pub const DEFAULT_USERNAME_DEBOUNCE: Duration = Duration::from_secs(3);
const LOGIN_RESULT_CAPACITY: usize = 64;

/// One per login tap, emitted after the auth trigger fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginTriggered;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    pub username: Username,
    pub base_url: Url,
}

pub struct LoginBindings {
    pub login_tapped: BoxStream<'static, ()>,
    pub remember_toggled: BoxStream<'static, ()>,
    pub username_changed: BoxStream<'static, Option<String>>,
}

impl LoginBindings {
    /// Channel-backed bindings for callers that push events imperatively.
    pub fn channels() -> (LoginInputs, Self) {
        let (login_tx, login_rx) = mpsc::unbounded_channel();
        let (remember_tx, remember_rx) = mpsc::unbounded_channel();
        let (username_tx, username_rx) = mpsc::unbounded_channel();
        (
            LoginInputs {
                login_tx,
                remember_tx,
                username_tx,
            },
            Self {
                login_tapped: UnboundedReceiverStream::new(login_rx).boxed(),
                remember_toggled: UnboundedReceiverStream::new(remember_rx).boxed(),
                username_changed: UnboundedReceiverStream::new(username_rx).boxed(),
            },
        )
    }
}

/// Sending half of [`LoginBindings::channels`]. Methods return `false` once
/// the controller stopped listening.
#[derive(Clone)]
pub struct LoginInputs {
    login_tx: mpsc::UnboundedSender<()>,
    remember_tx: mpsc::UnboundedSender<()>,
    username_tx: mpsc::UnboundedSender<Option<String>>,
}

impl LoginInputs {
    pub fn tap_login(&self) -> bool {
        self.login_tx.send(()).is_ok()
    }

    pub fn toggle_remember(&self) -> bool {
        self.remember_tx.send(()).is_ok()
    }

    pub fn change_username(&self, text: Option<String>) -> bool {
        self.username_tx.send(text).is_ok()
    }
}

#[derive(Clone)]
pub struct LoginDependencies {
    pub auth: Arc<dyn AuthService>,
    pub lookup: Arc<dyn EnvironmentLookup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginFlowOptions {
    pub debounce: Duration,
}

impl Default for LoginFlowOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_USERNAME_DEBOUNCE,
        }
    }
}

impl From<&LoginSettings> for LoginFlowOptions {
    fn from(settings: &LoginSettings) -> Self {
        Self {
            debounce: settings.debounce(),
        }
    }
}

/// Hands outputs to the dispatcher, and turns them into no-ops once the
/// controller is disposed, including jobs already sitting in a UI queue.
#[derive(Clone)]
struct OutputGate {
    alive: Arc<AtomicBool>,
    dispatcher: Arc<dyn UiDispatcher>,
}

impl OutputGate {
    fn deliver(&self, job: impl FnOnce() + Send + 'static) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let alive = Arc::clone(&self.alive);
        self.dispatcher.dispatch(Box::new(move || {
            if alive.load(Ordering::Acquire) {
                job();
            }
        }));
    }
}

pub struct LoginFlowController {
    login_results: broadcast::Sender<LoginTriggered>,
    remember_state: Arc<watch::Sender<bool>>,
    resolved_environment: Arc<watch::Sender<Option<ResolvedEnvironment>>>,
    alive: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
    aborted: Vec<JoinHandle<()>>,
}

impl LoginFlowController {
    /// Must be called from within a tokio runtime; the workers run on it.
    pub fn spawn(
        deps: LoginDependencies,
        bindings: LoginBindings,
        dispatcher: Arc<dyn UiDispatcher>,
        options: LoginFlowOptions,
    ) -> Self {
        let (login_results, _) = broadcast::channel(LOGIN_RESULT_CAPACITY);
        let remember_state = Arc::new(watch::channel(false).0);
        let resolved_environment = Arc::new(watch::channel(None).0);
        let alive = Arc::new(AtomicBool::new(true));
        let gate = OutputGate {
            alive: Arc::clone(&alive),
            dispatcher,
        };

        let tasks = vec![
            tokio::spawn(run_login_taps(
                bindings.login_tapped,
                Arc::clone(&deps.auth),
                login_results.clone(),
                gate.clone(),
            )),
            tokio::spawn(run_remember_toggles(
                bindings.remember_toggled,
                Arc::clone(&remember_state),
                gate.clone(),
            )),
            tokio::spawn(
                UsernamePipeline::new(
                    Arc::clone(&deps.lookup),
                    Arc::clone(&resolved_environment),
                    gate,
                    options.debounce,
                )
                .run(bindings.username_changed),
            ),
        ];

        Self {
            login_results,
            remember_state,
            resolved_environment,
            alive,
            tasks,
            aborted: Vec::new(),
        }
    }

    pub fn subscribe_login_results(&self) -> broadcast::Receiver<LoginTriggered> {
        self.login_results.subscribe()
    }

    /// Replay-latest: a new receiver starts at the current value.
    pub fn remember_state(&self) -> watch::Receiver<bool> {
        self.remember_state.subscribe()
    }

    pub fn resolved_environment(&self) -> watch::Receiver<Option<ResolvedEnvironment>> {
        self.resolved_environment.subscribe()
    }

    /// Requests cancellation of every worker, which drops the pending debounce
    /// timer and any in-flight lookup, and silences outputs already queued for
    /// the UI. Idempotent.
    ///
    /// Outputs stop synchronously. The workers themselves stop at their next
    /// await point: on a multi-thread runtime an `auth.login()` call already
    /// executing still returns. Await [`LoginFlowController::join`] to know
    /// every worker has been torn down.
    pub fn dispose(&mut self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
            self.aborted.push(task);
        }
        debug!("login flow disposed");
    }

    /// Waits until every worker aborted by [`LoginFlowController::dispose`] has
    /// finished. Returns immediately when the controller was never disposed.
    pub async fn join(&mut self) {
        for task in self.aborted.drain(..) {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(%err, "login flow worker failed during teardown");
                }
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }
}

impl Drop for LoginFlowController {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_login_taps(
    mut taps: BoxStream<'static, ()>,
    auth: Arc<dyn AuthService>,
    results: broadcast::Sender<LoginTriggered>,
    gate: OutputGate,
) {
    while taps.next().await.is_some() {
        auth.login();
        let results = results.clone();
        gate.deliver(move || {
            let _ = results.send(LoginTriggered);
        });
    }
}

async fn run_remember_toggles(
    mut toggles: BoxStream<'static, ()>,
    state: Arc<watch::Sender<bool>>,
    gate: OutputGate,
) {
    let mut remembered = false;
    while toggles.next().await.is_some() {
        remembered = !remembered;
        let state = Arc::clone(&state);
        gate.deliver(move || {
            state.send_replace(remembered);
        });
    }
}

type LookupOutcome = (Username, Result<Url, LookupError>);

struct UsernamePipeline {
    lookup: Arc<dyn EnvironmentLookup>,
    resolved: Arc<watch::Sender<Option<ResolvedEnvironment>>>,
    gate: OutputGate,
    debounce: Debounce<Option<String>>,
    distinct: DistinctUntilChanged<Option<String>>,
    lookups: SwitchLatest<LookupOutcome>,
}

impl UsernamePipeline {
    fn new(
        lookup: Arc<dyn EnvironmentLookup>,
        resolved: Arc<watch::Sender<Option<ResolvedEnvironment>>>,
        gate: OutputGate,
        window: Duration,
    ) -> Self {
        Self {
            lookup,
            resolved,
            gate,
            debounce: Debounce::new(window),
            distinct: DistinctUntilChanged::new(),
            lookups: SwitchLatest::new(),
        }
    }

    async fn run(mut self, mut input: BoxStream<'static, Option<String>>) {
        let mut input_open = true;
        loop {
            let deadline = self.debounce.deadline();
            tokio::select! {
                event = input.next(), if input_open => match event {
                    Some(text) => self.debounce.push(text, Instant::now()),
                    None => {
                        input_open = false;
                        if let Some(text) = self.debounce.flush() {
                            self.on_debounced(text);
                        }
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(text) = self.debounce.take_due(Instant::now()) {
                        self.on_debounced(text);
                    }
                }
                (generation, (username, outcome)) = self.lookups.next(), if !self.lookups.is_idle() => {
                    self.on_lookup_finished(generation, username, outcome);
                }
                else => break,
            }
        }
    }

    fn on_debounced(&mut self, text: Option<String>) {
        let Some(text) = self.distinct.admit(text) else {
            debug!("username unchanged since last lookup");
            return;
        };
        let Some(username) = Username::from_input(text) else {
            return;
        };

        let lookup = Arc::clone(&self.lookup);
        let (generation, superseded) = self.lookups.switch(async move {
            let outcome = lookup.base_url(&username).await;
            (username, outcome)
        });
        if let Some(superseded) = superseded {
            debug!(superseded, generation, "dropping superseded environment lookup");
        }
    }

    fn on_lookup_finished(
        &mut self,
        generation: u64,
        username: Username,
        outcome: Result<Url, LookupError>,
    ) {
        if !self.lookups.accepts(generation) {
            return;
        }
        match outcome {
            Ok(base_url) => {
                info!(%username, %base_url, "resolved partner environment");
                let resolved = Arc::clone(&self.resolved);
                self.gate.deliver(move || {
                    resolved.send_replace(Some(ResolvedEnvironment { username, base_url }));
                });
            }
            Err(err) => {
                debug!(
                    %username,
                    code = ?err.code(),
                    %err,
                    "partner environment lookup failed"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/login_flow_tests.rs"]
mod tests;
