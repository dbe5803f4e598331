#![allow(clippy::unwrap_used)]
// Integration tests for `Controller` against an in-memory remote client.
// Time is paused so backoff and expiry run instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Notify, broadcast};

use jablosync_api::{Ack, Error, RawGate, RawSection, RawSensor, RemoteClient, SectionControl};
use jablosync_core::{
    ArmMode, Availability, CommandOutcome, Controller, CoreError, OutcomeStatus, PanelState,
    RefreshTicket, SyncConfig,
};

// ── Mock client ─────────────────────────────────────────────────────

struct MockState {
    sections: Vec<RawSection>,
    gates: Vec<RawGate>,
    sensors: Vec<RawSensor>,
    failures_left: u32,
    ack: Ack,
    /// Reflect accepted commands in later fetches.
    apply_commands: bool,
    last_pin: Option<String>,
    last_bypass: Option<bool>,
    last_gate_pin: Option<Option<String>>,
}

struct MockClient {
    state: Mutex<MockState>,
    fetches: AtomicUsize,
    arm_calls: AtomicUsize,
    gate_calls: AtomicUsize,
    /// When set, every section fetch waits for a notification.
    hold: Option<Arc<Notify>>,
}

impl MockClient {
    fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                sections: vec![
                    raw_section("1:S1", "DISARM", true, true),
                    raw_section("1:S2", "DISARM", true, false),
                    raw_section("1:S3", "ARM", false, false),
                ],
                gates: vec![raw_gate("1:PG1", "OFF", true), raw_gate("1:PG2", "ON", false)],
                sensors: vec![RawSensor {
                    id: "1:T1".into(),
                    name: "Hall".into(),
                    kind: "TEMPERATURE".into(),
                    value: Some(21.5),
                    unit: "°C".into(),
                }],
                failures_left: 0,
                ack: Ack::Accepted,
                apply_commands: true,
                last_pin: None,
                last_bypass: None,
                last_gate_pin: None,
            }),
            fetches: AtomicUsize::new(0),
            arm_calls: AtomicUsize::new(0),
            gate_calls: AtomicUsize::new(0),
            hold: None,
        }
    }

    fn held(hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::new()
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn arm_calls(&self) -> usize {
        self.arm_calls.load(Ordering::SeqCst)
    }

    fn gate_calls(&self) -> usize {
        self.gate_calls.load(Ordering::SeqCst)
    }
}

fn raw_section(id: &str, state: &str, can_control: bool, partial: bool) -> RawSection {
    RawSection {
        id: id.into(),
        name: format!("Section {id}"),
        state: Some(state.into()),
        can_control,
        partial_arm_enabled: partial,
        need_authorization: true,
        can_bypass: id != "1:S2",
    }
}

fn raw_gate(id: &str, state: &str, can_control: bool) -> RawGate {
    RawGate {
        id: id.into(),
        name: format!("Gate {id}"),
        section_id: None,
        can_control,
        state: Some(state.into()),
    }
}

impl RemoteClient for MockClient {
    async fn fetch_sections(&self) -> Result<Vec<RawSection>, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        let mut state = self.state();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(Error::Api {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(state.sections.clone())
    }

    async fn fetch_gates(&self) -> Result<Vec<RawGate>, Error> {
        Ok(self.state().gates.clone())
    }

    async fn fetch_sensors(&self) -> Result<Vec<RawSensor>, Error> {
        Ok(self.state().sensors.clone())
    }

    async fn send_arm(
        &self,
        section_id: &str,
        control: SectionControl,
        pin: &SecretString,
        bypass: bool,
    ) -> Result<Ack, Error> {
        self.arm_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.last_pin = Some(pin.expose_secret().to_owned());
        state.last_bypass = Some(bypass);
        if state.ack.is_accepted() && state.apply_commands {
            let reported = match control {
                SectionControl::Arm => "ARM",
                SectionControl::PartialArm => "PARTIAL_ARM",
                SectionControl::Disarm => "DISARM",
            };
            if let Some(section) = state.sections.iter_mut().find(|s| s.id == section_id) {
                section.state = Some(reported.into());
            }
        }
        Ok(state.ack.clone())
    }

    async fn send_gate(
        &self,
        gate_id: &str,
        on: bool,
        pin: Option<&SecretString>,
    ) -> Result<Ack, Error> {
        self.gate_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.last_gate_pin = Some(pin.map(|p| p.expose_secret().to_owned()));
        if state.ack.is_accepted() && state.apply_commands {
            if let Some(gate) = state.gates.iter_mut().find(|g| g.id == gate_id) {
                gate.state = Some(if on { "ON" } else { "OFF" }.into());
            }
        }
        Ok(state.ack.clone())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> SyncConfig {
    SyncConfig {
        default_pin: Some(SecretString::from("0000".to_owned())),
        ..SyncConfig::default()
    }
}

fn pin(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_owned()))
}

fn controller(client: &Arc<MockClient>, config: SyncConfig) -> Controller<Arc<MockClient>> {
    Controller::new(Arc::clone(client), config)
}

/// Let spawned tasks run without reaching the next poll.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn drain(rx: &mut broadcast::Receiver<CommandOutcome>) -> Vec<OutcomeStatus> {
    let mut statuses = Vec::new();
    while let Ok(outcome) = rx.try_recv() {
        statuses.push(outcome.status);
    }
    statuses
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn refresh_now_publishes_snapshot() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    assert_eq!(ctl.availability(), Availability::Unknown);

    let snapshot = ctl.refresh_now().await.unwrap();

    assert_eq!(snapshot.sections().count(), 3);
    assert_eq!(snapshot.gates().count(), 2);
    assert_eq!(snapshot.sensors().count(), 1);
    assert_eq!(ctl.availability(), Availability::Available);
    assert!(ctl.status().last_success.is_some());
}

#[tokio::test(start_paused = true)]
async fn start_twice_is_noop() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());

    assert!(ctl.start());
    assert!(!ctl.start());
    settle().await;
    assert_eq!(client.fetches(), 1);

    assert!(ctl.stop());
    assert!(!ctl.stop());
}

#[tokio::test(start_paused = true)]
async fn force_refresh_requests_coalesce() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    assert_eq!(ctl.force_refresh(), RefreshTicket::NotRunning);

    ctl.start();
    settle().await;
    assert_eq!(client.fetches(), 1);

    assert_eq!(ctl.force_refresh(), RefreshTicket::Scheduled);
    for _ in 0..4 {
        assert_eq!(ctl.force_refresh(), RefreshTicket::Coalesced);
    }
    settle().await;
    assert_eq!(client.fetches(), 2);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.fetches(), 2);
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn force_refresh_during_fetch_runs_one_more_cycle() {
    let hold = Arc::new(Notify::new());
    let client = Arc::new(MockClient::held(Arc::clone(&hold)));
    let ctl = controller(&client, config());

    ctl.start();
    settle().await;
    assert_eq!(client.fetches(), 1);

    // The first fetch is still waiting on the cloud.
    assert_eq!(ctl.force_refresh(), RefreshTicket::Scheduled);
    for _ in 0..4 {
        assert_eq!(ctl.force_refresh(), RefreshTicket::Coalesced);
    }
    assert_eq!(client.fetches(), 1);

    hold.notify_one();
    settle().await;
    assert_eq!(client.fetches(), 2);

    hold.notify_one();
    settle().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.fetches(), 2);
    assert!(ctl.snapshot().is_some());
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn polls_on_interval() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());

    ctl.start();
    settle().await;
    assert_eq!(client.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(client.fetches(), 2);
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_fetch() {
    let hold = Arc::new(Notify::new());
    let client = Arc::new(MockClient::held(Arc::clone(&hold)));
    let ctl = controller(&client, config());

    ctl.start();
    settle().await;
    assert_eq!(client.fetches(), 1);

    assert!(ctl.stop());
    hold.notify_one();
    settle().await;

    assert!(ctl.snapshot().is_none());
    assert_eq!(ctl.availability(), Availability::Unknown);
    assert!(!ctl.status().running);
}

#[tokio::test(start_paused = true)]
async fn poll_timeout_is_a_cycle_failure() {
    let hold = Arc::new(Notify::new());
    let client = Arc::new(MockClient::held(hold));
    let ctl = controller(&client, config());

    let err = ctl.refresh_now().await.unwrap_err();

    assert!(matches!(err, CoreError::Transport { auth: false, .. }));
    assert!(err.to_string().contains("timed out"));
    assert_eq!(ctl.status().consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_then_resets_after_success() {
    let client = Arc::new(MockClient::new());
    client.state().failures_left = 2;
    let ctl = controller(&client, config());

    ctl.start();
    settle().await;
    let status = ctl.status();
    assert_eq!(status.consecutive_failures, 1);
    assert_eq!(status.next_delay, Duration::from_secs(60));
    assert_eq!(ctl.availability(), Availability::Unknown);

    tokio::time::sleep(Duration::from_secs(61)).await;
    let status = ctl.status();
    assert_eq!(status.consecutive_failures, 2);
    assert_eq!(status.next_delay, Duration::from_secs(120));

    tokio::time::sleep(Duration::from_secs(121)).await;
    let status = ctl.status();
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.next_delay, Duration::from_secs(30));
    assert!(status.last_error.is_none());
    assert_eq!(ctl.availability(), Availability::Available);
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_degrade_then_recover() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    client.state().failures_left = 3;
    for _ in 0..2 {
        ctl.refresh_now().await.unwrap_err();
        assert_eq!(ctl.availability(), Availability::Available);
    }
    ctl.refresh_now().await.unwrap_err();
    assert_eq!(ctl.availability(), Availability::Degraded);

    // The stale snapshot is kept, but nothing is presented as current.
    assert!(ctl.snapshot().is_some());
    let views = ctl.entities();
    assert!(views.alarm_panels.iter().all(|p| p.state == PanelState::Unavailable));
    assert!(views.switches.iter().all(|s| s.is_on.is_none()));
    assert!(views.sensors.iter().all(|s| s.value.is_none()));

    ctl.refresh_now().await.unwrap();
    assert_eq!(ctl.availability(), Availability::Available);
    assert_eq!(ctl.panel("1:S1").unwrap().state, PanelState::Disarmed);
}

#[tokio::test(start_paused = true)]
async fn listeners_run_after_reconciliation() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = ctl.clone();
    let record = Arc::clone(&seen);
    ctl.on_snapshot(move |_| {
        record.lock().unwrap().push(observer.pending().len());
    });

    ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap();
    assert_eq!(ctl.pending().len(), 1);

    let mut stream = ctl.subscribe();
    ctl.refresh_now().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0]);
    let published = stream.changed().await.unwrap();
    assert_eq!(
        published.section("1:S1").unwrap().armed_kind,
        jablosync_core::ArmedKind::Armed
    );
}

// ── Commands: validation ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn commands_need_a_snapshot() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());

    let err = ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap_err();
    assert!(matches!(err, CoreError::NoSnapshot));
    assert_eq!(client.arm_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_pin_makes_no_remote_call() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, SyncConfig::default());
    ctl.refresh_now().await.unwrap();

    let err = ctl.arm("1:S1", ArmMode::Home, None, None).await.unwrap_err();
    assert!(matches!(err, CoreError::MissingPin { .. }));

    let err = ctl.disarm("1:S1", None).await.unwrap_err();
    assert!(matches!(err, CoreError::MissingPin { .. }));

    assert_eq!(client.arm_calls(), 0);
    assert!(ctl.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn read_only_gate_is_not_controllable() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    let err = ctl.set_gate("1:PG2", true).await.unwrap_err();

    assert!(matches!(err, CoreError::NotControllable { .. }));
    assert_eq!(client.gate_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_entities_are_not_found() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    let err = ctl.set_gate("1:PG9", true).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity_type: "gate", .. }));

    let err = ctl.disarm("1:S9", None).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity_type: "section", .. }));
}

#[tokio::test(start_paused = true)]
async fn home_needs_partial_arm_support() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    let err = ctl.arm("1:S2", ArmMode::Home, None, None).await.unwrap_err();

    assert!(matches!(err, CoreError::Unsupported { .. }));
    assert_eq!(client.arm_calls(), 0);
    assert!(!ctl.panel("1:S2").unwrap().supports_arm_home);
}

#[tokio::test(start_paused = true)]
async fn uncontrollable_section_is_refused() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    let err = ctl.disarm("1:S3", None).await.unwrap_err();

    assert!(matches!(err, CoreError::NotControllable { .. }));
    assert!(ctl.panel("1:S3").is_none());
}

#[tokio::test(start_paused = true)]
async fn pin_and_bypass_resolution() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap();
    {
        let state = client.state();
        assert_eq!(state.last_pin.as_deref(), Some("0000"));
        assert_eq!(state.last_bypass, Some(true));
    }

    ctl.arm("1:S1", ArmMode::Away, pin("4321"), Some(false)).await.unwrap();
    {
        let state = client.state();
        assert_eq!(state.last_pin.as_deref(), Some("4321"));
        assert_eq!(state.last_bypass, Some(false));
    }

    // The flag goes out as resolved; the panel decides what bypass means.
    ctl.arm("1:S2", ArmMode::Away, None, Some(true)).await.unwrap();
    assert_eq!(client.state().last_bypass, Some(true));
}

// ── Commands: outcomes ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rejected_command_installs_nothing() {
    let client = Arc::new(MockClient::new());
    client.state().ack = Ack::Rejected {
        reason: "INCORRECT_PIN_CODE".into(),
    };
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    let err = ctl.arm("1:S1", ArmMode::Away, pin("9999"), None).await.unwrap_err();

    match err {
        CoreError::CommandRejected { reason, .. } => assert_eq!(reason, "INCORRECT_PIN_CODE"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(ctl.pending().is_empty());
    assert!(!ctl.panel("1:S1").unwrap().pending);
    assert_eq!(
        drain(&mut outcomes),
        vec![OutcomeStatus::Failed {
            reason: "INCORRECT_PIN_CODE".into()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn accepted_command_shows_target_until_confirmed() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    ctl.arm("1:S1", ArmMode::Home, None, None).await.unwrap();

    // The snapshot still says disarmed; the panel shows the target.
    let panel = ctl.panel("1:S1").unwrap();
    assert_eq!(panel.state, PanelState::ArmedHome);
    assert!(panel.pending);

    ctl.refresh_now().await.unwrap();
    let panel = ctl.panel("1:S1").unwrap();
    assert_eq!(panel.state, PanelState::ArmedHome);
    assert!(!panel.pending);
    assert!(ctl.pending().is_empty());
    assert_eq!(
        drain(&mut outcomes),
        vec![OutcomeStatus::Accepted, OutcomeStatus::Confirmed]
    );
}

#[tokio::test(start_paused = true)]
async fn gate_switch_confirms() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();

    ctl.set_gate("1:PG1", true).await.unwrap();
    let switch = ctl.switch("1:PG1").unwrap();
    assert_eq!(switch.is_on, Some(true));
    assert!(switch.pending);

    ctl.refresh_now().await.unwrap();
    let switch = ctl.switch("1:PG1").unwrap();
    assert_eq!(switch.is_on, Some(true));
    assert!(!switch.pending);
    assert_eq!(client.gate_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn gate_switch_sends_default_code_when_configured() {
    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    ctl.set_gate("1:PG1", true).await.unwrap();
    assert_eq!(client.state().last_gate_pin, Some(Some("0000".to_owned())));

    let client = Arc::new(MockClient::new());
    let ctl = controller(&client, SyncConfig::default());
    ctl.refresh_now().await.unwrap();
    ctl.set_gate("1:PG1", true).await.unwrap();
    assert_eq!(client.state().last_gate_pin, Some(None));
}

#[tokio::test(start_paused = true)]
async fn contradicted_command_is_resent_once_then_diverges() {
    let client = Arc::new(MockClient::new());
    client.state().apply_commands = false;
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap();

    settle().await;
    ctl.refresh_now().await.unwrap();
    // No flicker back to disarmed while the re-send is outstanding.
    let panel = ctl.panel("1:S1").unwrap();
    assert_eq!(panel.state, PanelState::ArmedAway);
    assert!(panel.pending);

    settle().await;
    assert_eq!(client.arm_calls(), 2);

    ctl.refresh_now().await.unwrap();
    let panel = ctl.panel("1:S1").unwrap();
    assert_eq!(panel.state, PanelState::Disarmed);
    assert!(!panel.pending);
    assert_eq!(client.arm_calls(), 2);
    assert_eq!(
        drain(&mut outcomes),
        vec![
            OutcomeStatus::Accepted,
            OutcomeStatus::Retrying { attempt: 2 },
            OutcomeStatus::Diverged {
                reported: "disarmed".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn resend_is_not_judged_before_it_reaches_the_cloud() {
    let client = Arc::new(MockClient::new());
    client.state().apply_commands = false;
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap();
    settle().await;

    // Two polls back to back: the second must not give up on a re-send
    // that hasn't been made yet.
    ctl.refresh_now().await.unwrap();
    ctl.refresh_now().await.unwrap();

    settle().await;
    assert_eq!(client.arm_calls(), 2);

    ctl.refresh_now().await.unwrap();
    assert!(ctl.pending().is_empty());
    assert_eq!(
        drain(&mut outcomes),
        vec![
            OutcomeStatus::Accepted,
            OutcomeStatus::Retrying { attempt: 2 },
            OutcomeStatus::Diverged {
                reported: "disarmed".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn folded_partial_arm_never_shows_home() {
    let client = Arc::new(MockClient::new());
    client.state().apply_commands = false;
    let ctl = controller(
        &client,
        SyncConfig {
            distinguishes_partial_arm: false,
            ..config()
        },
    );
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    ctl.arm("1:S1", ArmMode::Home, None, None).await.unwrap();
    let panel = ctl.panel("1:S1").unwrap();
    assert_eq!(panel.state, PanelState::ArmedAway);
    assert!(panel.pending);

    // This cloud reports partial arming as a plain arm.
    client.state().sections[0].state = Some("ARM".into());
    settle().await;
    ctl.refresh_now().await.unwrap();

    let panel = ctl.panel("1:S1").unwrap();
    assert_eq!(panel.state, PanelState::ArmedAway);
    assert!(!panel.pending);
    assert_eq!(
        drain(&mut outcomes),
        vec![OutcomeStatus::Accepted, OutcomeStatus::Confirmed]
    );

    // Even a partial report is shown folded.
    client.state().sections[0].state = Some("PARTIAL_ARM".into());
    ctl.refresh_now().await.unwrap();
    assert_eq!(ctl.panel("1:S1").unwrap().state, PanelState::ArmedAway);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_command_expires() {
    let client = Arc::new(MockClient::new());
    client.state().apply_commands = false;
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap();
    tokio::time::advance(Duration::from_secs(91)).await;

    // Past the timeout the overlay is gone even before the next poll.
    assert_eq!(ctl.panel("1:S1").unwrap().state, PanelState::Disarmed);

    ctl.refresh_now().await.unwrap();
    assert!(ctl.pending().is_empty());
    assert_eq!(client.arm_calls(), 1);
    assert_eq!(
        drain(&mut outcomes),
        vec![OutcomeStatus::Accepted, OutcomeStatus::Expired]
    );
}

#[tokio::test(start_paused = true)]
async fn later_command_supersedes_pending_one() {
    let client = Arc::new(MockClient::new());
    client.state().apply_commands = false;
    let ctl = controller(&client, config());
    ctl.refresh_now().await.unwrap();
    let mut outcomes = ctl.outcomes();

    ctl.arm("1:S1", ArmMode::Away, None, None).await.unwrap();
    ctl.disarm("1:S1", None).await.unwrap();

    let pending = ctl.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending.get("1:S1").unwrap().kind,
        jablosync_core::CommandKind::Disarm
    );
    assert_eq!(
        drain(&mut outcomes),
        vec![
            OutcomeStatus::Accepted,
            OutcomeStatus::Superseded,
            OutcomeStatus::Accepted,
        ]
    );

    // Disarm matches what the panel reports.
    ctl.refresh_now().await.unwrap();
    assert!(ctl.pending().is_empty());
}
