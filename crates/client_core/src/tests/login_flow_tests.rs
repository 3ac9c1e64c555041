use super::*;
use crate::dispatch::{ui_channel, ImmediateDispatcher, UiJob};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex as StdMutex,
    },
};
use tokio::time::sleep;

#[derive(Clone)]
struct Script {
    delay: Duration,
    fail: bool,
}

#[derive(Default)]
struct ScriptedLookup {
    scripts: HashMap<String, Script>,
    started: StdMutex<Vec<(String, Instant)>>,
    finished: StdMutex<Vec<String>>,
}

impl ScriptedLookup {
    fn with(mut self, username: &str, delay: Duration, fail: bool) -> Self {
        self.scripts
            .insert(username.to_string(), Script { delay, fail });
        self
    }

    fn started(&self) -> Vec<String> {
        self.started
            .lock()
            .expect("lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn started_at(&self, index: usize) -> Instant {
        self.started.lock().expect("lock")[index].1
    }

    fn finished(&self) -> Vec<String> {
        self.finished.lock().expect("lock").clone()
    }
}

#[async_trait]
impl EnvironmentLookup for ScriptedLookup {
    async fn base_url(&self, username: &Username) -> Result<Url, LookupError> {
        let name = username.as_str().to_string();
        self.started
            .lock()
            .expect("lock")
            .push((name.clone(), Instant::now()));

        let script = self.scripts.get(&name).cloned().unwrap_or(Script {
            delay: Duration::from_millis(100),
            fail: false,
        });
        sleep(script.delay).await;
        self.finished.lock().expect("lock").push(name.clone());

        if script.fail {
            return Err(LookupError::Status(500));
        }
        Ok(Url::parse(&format!("https://{name}.partner.example/")).expect("url"))
    }
}

#[derive(Default)]
struct CountingAuth {
    calls: AtomicUsize,
    log: Option<Arc<StdMutex<Vec<&'static str>>>>,
}

impl AuthService for CountingAuth {
    fn login(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().expect("lock").push("auth");
        }
    }
}

struct RecordingDispatcher {
    log: Arc<StdMutex<Vec<&'static str>>>,
}

impl UiDispatcher for RecordingDispatcher {
    fn dispatch(&self, job: UiJob) {
        self.log.lock().expect("lock").push("deliver");
        job();
    }
}

struct Harness {
    inputs: LoginInputs,
    controller: LoginFlowController,
    lookup: Arc<ScriptedLookup>,
    auth: Arc<CountingAuth>,
    start: Instant,
}

fn harness_with(
    lookup: ScriptedLookup,
    auth: CountingAuth,
    dispatcher: Arc<dyn UiDispatcher>,
) -> Harness {
    let lookup = Arc::new(lookup);
    let auth = Arc::new(auth);
    let (inputs, bindings) = LoginBindings::channels();
    let controller = LoginFlowController::spawn(
        LoginDependencies {
            auth: auth.clone(),
            lookup: lookup.clone(),
        },
        bindings,
        dispatcher,
        LoginFlowOptions::default(),
    );
    Harness {
        inputs,
        controller,
        lookup,
        auth,
        start: Instant::now(),
    }
}

fn harness(lookup: ScriptedLookup) -> Harness {
    harness_with(lookup, CountingAuth::default(), Arc::new(ImmediateDispatcher))
}

async fn advance_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

fn type_username(h: &Harness, text: &str) {
    assert!(h.inputs.change_username(Some(text.to_string())));
}

fn assert_elapsed_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn resolved_username(h: &Harness) -> Option<String> {
    h.controller
        .resolved_environment()
        .borrow()
        .as_ref()
        .map(|resolved| resolved.username.as_str().to_string())
}

#[tokio::test(start_paused = true)]
async fn burst_forwards_only_last_value_after_quiet_period() {
    let h = harness(ScriptedLookup::default());

    type_username(&h, "a");
    advance_ms(1_000).await;
    type_username(&h, "ab");
    advance_ms(1_000).await;
    type_username(&h, "abc");

    advance_ms(2_900).await;
    assert!(h.lookup.started().is_empty());

    advance_ms(200).await;
    assert_eq!(h.lookup.started(), vec!["abc".to_string()]);
    assert_elapsed_near(
        h.lookup.started_at(0) - h.start,
        Duration::from_millis(5_000),
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_value_does_not_trigger_second_lookup() {
    let h = harness(ScriptedLookup::default());

    type_username(&h, "alice");
    advance_ms(4_000).await;
    type_username(&h, "alice");
    advance_ms(4_000).await;

    assert_eq!(h.lookup.started(), vec!["alice".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn distinct_only_compares_with_previous_forwarded_value() {
    let h = harness(ScriptedLookup::default());

    for name in ["alice", "bob", "alice"] {
        type_username(&h, name);
        advance_ms(4_000).await;
    }

    assert_eq!(
        h.lookup.started(),
        vec!["alice".to_string(), "bob".to_string(), "alice".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn empty_and_absent_values_never_trigger_lookup() {
    let h = harness(ScriptedLookup::default());

    type_username(&h, "");
    advance_ms(4_000).await;
    assert!(h.inputs.change_username(None));
    advance_ms(4_000).await;
    assert!(h.lookup.started().is_empty());

    type_username(&h, "carol");
    advance_ms(4_000).await;
    assert_eq!(h.lookup.started(), vec!["carol".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn superseded_lookup_result_never_surfaces() {
    let h = harness(
        ScriptedLookup::default()
            .with("slow", Duration::from_secs(10), false)
            .with("fast", Duration::from_secs(1), false),
    );

    type_username(&h, "slow");
    advance_ms(4_000).await;
    assert_eq!(h.lookup.started(), vec!["slow".to_string()]);

    type_username(&h, "fast");
    advance_ms(26_000).await;

    assert_eq!(
        h.lookup.started(),
        vec!["slow".to_string(), "fast".to_string()]
    );
    assert_eq!(h.lookup.finished(), vec!["fast".to_string()]);
    assert_eq!(resolved_username(&h).as_deref(), Some("fast"));
}

#[tokio::test(start_paused = true)]
async fn superseding_failure_also_hides_earlier_success() {
    let h = harness(
        ScriptedLookup::default()
            .with("first", Duration::from_secs(10), false)
            .with("second", Duration::from_millis(10), true),
    );

    type_username(&h, "first");
    advance_ms(4_000).await;
    type_username(&h, "second");
    advance_ms(30_000).await;

    assert_eq!(h.lookup.finished(), vec!["second".to_string()]);
    assert_eq!(resolved_username(&h), None);
}

#[tokio::test(start_paused = true)]
async fn failed_lookup_does_not_stop_pipeline() {
    let h = harness(ScriptedLookup::default().with("bad", Duration::from_millis(10), true));

    type_username(&h, "bad");
    advance_ms(4_000).await;
    assert_eq!(resolved_username(&h), None);

    type_username(&h, "good");
    advance_ms(4_000).await;

    assert_eq!(
        h.lookup.started(),
        vec!["bad".to_string(), "good".to_string()]
    );
    assert_eq!(resolved_username(&h).as_deref(), Some("good"));
    let resolved = h.controller.resolved_environment().borrow().clone();
    assert_eq!(
        resolved.map(|r| r.base_url.to_string()),
        Some("https://good.partner.example/".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn remember_state_flips_and_replays_latest() {
    let h = harness(ScriptedLookup::default());
    let mut early = h.controller.remember_state();
    assert!(!*early.borrow());

    for _ in 0..3 {
        assert!(h.inputs.toggle_remember());
    }
    advance_ms(10).await;

    let late = h.controller.remember_state();
    assert!(*late.borrow());
    assert!(early.has_changed().expect("sender alive"));
    assert!(*early.borrow_and_update());

    assert!(h.inputs.toggle_remember());
    advance_ms(10).await;
    assert!(!*h.controller.remember_state().borrow());
}

#[tokio::test(start_paused = true)]
async fn typing_scenario_with_late_repeat_fires_once() {
    let h = harness(ScriptedLookup::default());

    type_username(&h, "a");
    advance_ms(50).await;
    type_username(&h, "ab");
    advance_ms(3_150).await;
    type_username(&h, "ab");
    advance_ms(10_000).await;

    assert_eq!(h.lookup.started(), vec!["ab".to_string()]);
    assert_elapsed_near(
        h.lookup.started_at(0) - h.start,
        Duration::from_millis(3_050),
    );
}

#[tokio::test(start_paused = true)]
async fn each_login_tap_triggers_auth_before_result() {
    let log = Arc::new(StdMutex::new(Vec::new()));
    let h = harness_with(
        ScriptedLookup::default(),
        CountingAuth {
            calls: AtomicUsize::new(0),
            log: Some(Arc::clone(&log)),
        },
        Arc::new(RecordingDispatcher {
            log: Arc::clone(&log),
        }),
    );
    let mut results = h.controller.subscribe_login_results();

    for _ in 0..3 {
        assert!(h.inputs.tap_login());
    }
    advance_ms(10).await;

    assert_eq!(h.auth.calls.load(Ordering::SeqCst), 3);
    for _ in 0..3 {
        assert_eq!(results.try_recv().expect("login result"), LoginTriggered);
    }
    assert!(results.try_recv().is_err());
    assert_eq!(
        *log.lock().expect("lock"),
        vec!["auth", "deliver", "auth", "deliver", "auth", "deliver"]
    );
}

#[tokio::test(start_paused = true)]
async fn closing_username_input_flushes_pending_value() {
    let h = harness(ScriptedLookup::default());

    type_username(&h, "dave");
    let Harness {
        inputs,
        controller: _controller,
        lookup,
        start,
        ..
    } = h;
    drop(inputs);
    advance_ms(500).await;

    assert_eq!(lookup.started(), vec!["dave".to_string()]);
    assert!(lookup.started_at(0) - start < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_pending_debounce() {
    let mut h = harness(ScriptedLookup::default());

    type_username(&h, "erin");
    advance_ms(1_000).await;
    h.controller.dispose();
    advance_ms(10_000).await;

    assert!(h.lookup.started().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dispose_drops_in_flight_lookup() {
    let mut h = harness(ScriptedLookup::default().with("slow", Duration::from_secs(10), false));

    type_username(&h, "slow");
    advance_ms(4_000).await;
    assert_eq!(h.lookup.started(), vec!["slow".to_string()]);

    h.controller.dispose();
    advance_ms(20_000).await;

    assert!(h.lookup.finished().is_empty());
    assert_eq!(resolved_username(&h), None);
}

#[tokio::test(start_paused = true)]
async fn dispose_is_idempotent_and_releases_inputs() {
    let mut h = harness(ScriptedLookup::default());
    assert!(!h.controller.is_disposed());

    h.controller.dispose();
    h.controller.dispose();
    assert!(h.controller.is_disposed());

    advance_ms(10).await;
    assert!(!h.inputs.tap_login());
    assert!(!h.inputs.toggle_remember());
    assert_eq!(h.auth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn outputs_wait_for_ui_queue_and_die_with_controller() {
    let (dispatcher, queue) = ui_channel(16);
    let mut h = harness_with(
        ScriptedLookup::default(),
        CountingAuth::default(),
        Arc::new(dispatcher),
    );

    assert!(h.inputs.toggle_remember());
    advance_ms(10).await;
    assert!(!*h.controller.remember_state().borrow());
    assert_eq!(queue.run_pending(), 1);
    assert!(*h.controller.remember_state().borrow());

    assert!(h.inputs.toggle_remember());
    advance_ms(10).await;
    h.controller.dispose();
    assert_eq!(queue.run_pending(), 1);
    assert!(*h.controller.remember_state().borrow());
}

#[tokio::test(start_paused = true)]
async fn join_after_dispose_waits_for_workers() {
    let mut h = harness(ScriptedLookup::default().with("slow", Duration::from_secs(10), false));

    type_username(&h, "slow");
    advance_ms(4_000).await;
    assert_eq!(h.lookup.started(), vec!["slow".to_string()]);

    h.controller.join().await;
    assert!(h.inputs.tap_login());
    advance_ms(10).await;
    assert_eq!(h.auth.calls.load(Ordering::SeqCst), 1);

    h.controller.dispose();
    h.controller.join().await;

    assert!(!h.inputs.tap_login());
    assert!(!h.inputs.toggle_remember());
    assert!(!h.inputs.change_username(Some("next".to_string())));
    assert!(h.lookup.finished().is_empty());
    assert_eq!(h.auth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn join_on_multi_thread_runtime_releases_inputs() {
    let mut h = harness(ScriptedLookup::default());
    assert!(h.inputs.tap_login());

    h.controller.dispose();
    h.controller.join().await;

    assert!(!h.inputs.tap_login());
    assert!(!h.inputs.change_username(None));
}
