//! ============================================================================
//! Access Controller - Registration plus periodic access re-validation
//! ============================================================================
//! Owned by whatever composes the app; nothing runs until `start()`.
//! Transport failures are logged and treated as offline use. Only an
//! explicit `access: false` decision changes what the user sees, and it
//! does so permanently for this controller.
//! ============================================================================

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::client::AccessApi;
use super::schedule::PeriodicTask;
use super::view::AccessView;
use crate::config::ControllerConfig;
use crate::error::AccessError;
use crate::identity::DeviceIdentity;
use crate::types::{
    Banner, CheckAccessRequest, CheckOutcome, ControllerState, DenialNotice, RegisterRequest,
};

/// Keeps one device's access to the app current
pub struct AccessController {
    inner: Arc<Inner>,
    started: AtomicBool,
    task: Mutex<Option<PeriodicTask>>,
}

struct Inner {
    api: Arc<dyn AccessApi>,
    view: Arc<dyn AccessView>,
    device: DeviceIdentity,
    config: ControllerConfig,
    state: watch::Sender<ControllerState>,
    checks: AtomicU64,
    next_banner_id: AtomicU64,
}

impl AccessController {
    pub fn new(
        api: Arc<dyn AccessApi>,
        view: Arc<dyn AccessView>,
        device: DeviceIdentity,
        config: ControllerConfig,
    ) -> Self {
        let (state, _) = watch::channel(ControllerState::Initializing);
        Self {
            inner: Arc::new(Inner {
                api,
                view,
                device,
                config,
                state,
                checks: AtomicU64::new(0),
                next_banner_id: AtomicU64::new(1),
            }),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Register the device, check access once, then schedule recurring
    /// checks. Returns the outcome of the first check.
    pub async fn start(&self) -> Result<CheckOutcome, AccessError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AccessError::AlreadyStarted);
        }

        info!("Starting access controller for {}", self.inner.device);

        self.inner.register().await;
        let first = self.inner.check().await;

        self.inner.state.send_if_modified(|state| {
            if *state == ControllerState::Initializing {
                *state = ControllerState::Polling;
                true
            } else {
                false
            }
        });
        if self.state().is_terminal() {
            return Ok(first);
        }

        let inner = Arc::clone(&self.inner);
        let task = PeriodicTask::spawn(self.inner.config.check_interval, move || {
            let inner = Arc::clone(&inner);
            async move {
                match inner.check().await {
                    CheckOutcome::Denied(_) | CheckOutcome::AlreadyDenied => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                }
            }
        });
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        // A manual check may have denied access while the task was being set up
        if self.state().is_terminal() {
            self.stop();
        }

        debug!(
            "Polling access every {}s",
            self.inner.config.check_interval.as_secs()
        );
        Ok(first)
    }

    /// Run one access check now, outside the schedule
    pub async fn check_access(&self) -> CheckOutcome {
        let outcome = self.inner.check().await;
        if matches!(outcome, CheckOutcome::Denied(_)) {
            self.stop();
        }
        outcome
    }

    /// Cancel recurring checks. A check already in flight completes.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.cancel();
            info!("Access polling stopped");
        }
    }

    pub fn state(&self) -> ControllerState {
        *self.inner.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.inner.state.subscribe()
    }

    pub fn device_id(&self) -> &DeviceIdentity {
        &self.inner.device
    }

    /// Number of access-check requests attempted so far
    pub fn checks_performed(&self) -> u64 {
        self.inner.checks.load(Ordering::SeqCst)
    }

    /// Whether recurring checks are currently scheduled
    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|task| !task.is_finished() && !task.is_cancelled())
            .unwrap_or(false)
    }
}

impl Inner {
    /// Fire-and-forget registration; failure is logged only
    async fn register(&self) {
        let request = RegisterRequest {
            device_id: self.device.to_string(),
            email: self.config.email.clone(),
        };

        match self.api.register(&request).await {
            Ok(receipt) => info!("Device registered: {:?}", receipt),
            Err(e) => warn!("Registration failed: {}", e),
        }
    }

    async fn check(&self) -> CheckOutcome {
        let denied = self.state.borrow().is_terminal();
        if denied {
            return CheckOutcome::AlreadyDenied;
        }

        self.checks.fetch_add(1, Ordering::SeqCst);
        let request = CheckAccessRequest {
            device_id: self.device.to_string(),
        };

        let decision = match self.api.check_access(&request).await {
            Ok(decision) => decision,
            Err(e) => {
                // Allow offline usage until the next scheduled check
                warn!("Access check failed: {}", e);
                return CheckOutcome::Skipped(e.to_string());
            }
        };

        if !decision.access {
            return self.deny(DenialNotice::from_decision(&decision));
        }

        match decision.warning {
            Some(message) => {
                self.show_banner(&message);
                CheckOutcome::Warned(message)
            }
            None => {
                debug!("Access granted for {}", self.device);
                CheckOutcome::Allowed
            }
        }
    }

    fn deny(&self, notice: DenialNotice) -> CheckOutcome {
        let newly_denied = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ControllerState::Denied;
                true
            }
        });
        if !newly_denied {
            return CheckOutcome::AlreadyDenied;
        }

        warn!(
            "Access denied for {} ({:?}): {}",
            self.device, notice.reason, notice.message
        );
        self.view.show_denied(&notice);
        CheckOutcome::Denied(notice)
    }

    fn show_banner(&self, message: &str) {
        let banner = Banner {
            id: self.next_banner_id.fetch_add(1, Ordering::SeqCst),
            message: message.to_string(),
        };
        self.view.show_banner(&banner);

        let view = Arc::clone(&self.view);
        let visible_for = self.config.banner_duration;
        tokio::spawn(async move {
            tokio::time::sleep(visible_for).await;
            view.dismiss_banner(banner.id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::client::HttpAccessApi;
    use crate::types::{AccessDecision, DenialReason, RegistrationReceipt};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    /// Replays queued decisions, then allows
    #[derive(Default)]
    struct ScriptedApi {
        decisions: Mutex<VecDeque<Result<AccessDecision, AccessError>>>,
        register_fails: bool,
        registrations: AtomicU64,
        checks: AtomicU64,
    }

    impl ScriptedApi {
        fn with(decisions: Vec<Result<AccessDecision, AccessError>>) -> Self {
            Self {
                decisions: Mutex::new(decisions.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl AccessApi for ScriptedApi {
        async fn register(&self, _request: &RegisterRequest) -> Result<RegistrationReceipt, AccessError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            if self.register_fails {
                return Err(offline());
            }
            Ok(RegistrationReceipt::default())
        }

        async fn check_access(&self, _request: &CheckAccessRequest) -> Result<AccessDecision, AccessError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.decisions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(AccessDecision::allowed()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum ViewEvent {
        Denied(DenialNotice),
        Shown(Banner),
        Dismissed(u64),
    }

    #[derive(Default)]
    struct RecordingView {
        events: Mutex<Vec<ViewEvent>>,
    }

    impl RecordingView {
        fn events(&self) -> Vec<ViewEvent> {
            self.events.lock().unwrap().clone()
        }

        fn visible_banners(&self) -> usize {
            let events = self.events();
            let shown = events.iter().filter(|e| matches!(e, ViewEvent::Shown(_))).count();
            let dismissed = events.iter().filter(|e| matches!(e, ViewEvent::Dismissed(_))).count();
            shown - dismissed
        }
    }

    impl AccessView for RecordingView {
        fn show_denied(&self, notice: &DenialNotice) {
            self.events.lock().unwrap().push(ViewEvent::Denied(notice.clone()));
        }

        fn show_banner(&self, banner: &Banner) {
            self.events.lock().unwrap().push(ViewEvent::Shown(banner.clone()));
        }

        fn dismiss_banner(&self, id: u64) {
            self.events.lock().unwrap().push(ViewEvent::Dismissed(id));
        }
    }

    fn offline() -> AccessError {
        AccessError::Status {
            endpoint: "/api/check-access/".into(),
            status: 503,
            body: String::new(),
        }
    }

    fn controller(api: Arc<ScriptedApi>, view: Arc<RecordingView>) -> AccessController {
        AccessController::new(
            api,
            view,
            DeviceIdentity::from("device_test00001"),
            ControllerConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_registers_checks_and_polls() {
        let api = Arc::new(ScriptedApi::default());
        let view = Arc::new(RecordingView::default());
        let ctl = controller(Arc::clone(&api), Arc::clone(&view));

        assert_eq!(ctl.state(), ControllerState::Initializing);
        let first = ctl.start().await.unwrap();

        assert_eq!(first, CheckOutcome::Allowed);
        assert_eq!(api.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.checks_performed(), 1);
        assert_eq!(ctl.state(), ControllerState::Polling);
        assert!(ctl.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checks_repeat_every_five_minutes() {
        let api = Arc::new(ScriptedApi::default());
        let ctl = controller(Arc::clone(&api), Arc::new(RecordingView::default()));
        ctl.start().await.unwrap();

        tokio::time::sleep(FIVE_MINUTES - Duration::from_secs(1)).await;
        assert_eq!(ctl.checks_performed(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ctl.checks_performed(), 2);

        tokio::time::sleep(FIVE_MINUTES).await;
        assert_eq!(ctl.checks_performed(), 3);
        assert_eq!(api.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.state(), ControllerState::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denial_shows_message_and_stops_timer() {
        let api = Arc::new(ScriptedApi::with(vec![
            Ok(AccessDecision::allowed()),
            Ok(AccessDecision::denied(None, Some("X"))),
        ]));
        let view = Arc::new(RecordingView::default());
        let ctl = controller(Arc::clone(&api), Arc::clone(&view));
        ctl.start().await.unwrap();

        tokio::time::sleep(FIVE_MINUTES + Duration::from_secs(1)).await;
        assert_eq!(ctl.state(), ControllerState::Denied);
        assert_eq!(
            view.events(),
            vec![ViewEvent::Denied(DenialNotice {
                message: "X".into(),
                reason: None,
                retry_offered: false,
            })]
        );

        tokio::time::sleep(FIVE_MINUTES * 4).await;
        assert_eq!(api.checks.load(Ordering::SeqCst), 2);
        assert!(!ctl.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_check_denial_never_schedules() {
        let api = Arc::new(ScriptedApi::with(vec![Ok(AccessDecision::denied(
            Some(DenialReason::PaymentRequired),
            Some("Trial expired. Payment required to continue"),
        ))]));
        let view = Arc::new(RecordingView::default());
        let ctl = controller(Arc::clone(&api), Arc::clone(&view));

        let first = ctl.start().await.unwrap();
        match first {
            CheckOutcome::Denied(notice) => assert!(notice.retry_offered),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ctl.state(), ControllerState::Denied);
        assert!(!ctl.is_polling());

        tokio::time::sleep(FIVE_MINUTES * 2).await;
        assert_eq!(api.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_banner_dismissed_after_five_seconds() {
        let api = Arc::new(ScriptedApi::with(vec![Ok(
            AccessDecision::allowed().with_warning("Y")
        )]));
        let view = Arc::new(RecordingView::default());
        let ctl = controller(Arc::clone(&api), Arc::clone(&view));

        assert_eq!(ctl.start().await.unwrap(), CheckOutcome::Warned("Y".into()));
        assert_eq!(view.visible_banners(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(view.visible_banners(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(view.visible_banners(), 0);
        assert_eq!(
            view.events(),
            vec![
                ViewEvent::Shown(Banner { id: 1, message: "Y".into() }),
                ViewEvent::Dismissed(1),
            ]
        );

        tokio::time::sleep(FIVE_MINUTES).await;
        assert_eq!(ctl.checks_performed(), 2);
        assert_eq!(ctl.state(), ControllerState::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_check_changes_nothing_and_polling_continues() {
        let api = Arc::new(ScriptedApi::with(vec![Err(offline()), Err(offline())]));
        let view = Arc::new(RecordingView::default());
        let ctl = controller(Arc::clone(&api), Arc::clone(&view));

        let first = ctl.start().await.unwrap();
        assert!(matches!(first, CheckOutcome::Skipped(_)));
        assert_eq!(ctl.state(), ControllerState::Polling);

        tokio::time::sleep(FIVE_MINUTES + Duration::from_secs(1)).await;
        assert_eq!(ctl.checks_performed(), 2);
        assert_eq!(ctl.state(), ControllerState::Polling);

        tokio::time::sleep(FIVE_MINUTES).await;
        assert_eq!(ctl.checks_performed(), 3);
        assert!(view.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_failure_is_not_fatal() {
        let api = Arc::new(ScriptedApi {
            register_fails: true,
            ..ScriptedApi::default()
        });
        let ctl = controller(Arc::clone(&api), Arc::new(RecordingView::default()));

        assert_eq!(ctl.start().await.unwrap(), CheckOutcome::Allowed);
        tokio::time::sleep(FIVE_MINUTES + Duration::from_secs(1)).await;

        assert_eq!(api.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.checks_performed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let ctl = controller(Arc::new(ScriptedApi::default()), Arc::new(RecordingView::default()));
        ctl.start().await.unwrap();
        assert!(matches!(ctl.start().await, Err(AccessError::AlreadyStarted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_polling() {
        let api = Arc::new(ScriptedApi::default());
        let ctl = controller(Arc::clone(&api), Arc::new(RecordingView::default()));
        ctl.start().await.unwrap();

        ctl.stop();
        tokio::time::sleep(FIVE_MINUTES * 3).await;
        assert_eq!(ctl.checks_performed(), 1);
        assert_eq!(ctl.state(), ControllerState::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_denial_cancels_schedule() {
        let api = Arc::new(ScriptedApi::with(vec![
            Ok(AccessDecision::allowed()),
            Ok(AccessDecision::denied(Some(DenialReason::AccountDisabled), Some("Your account has been disabled"))),
        ]));
        let view = Arc::new(RecordingView::default());
        let ctl = controller(Arc::clone(&api), Arc::clone(&view));
        let mut states = ctl.subscribe();
        ctl.start().await.unwrap();

        let outcome = ctl.check_access().await;
        assert!(matches!(outcome, CheckOutcome::Denied(_)));
        assert!(!ctl.is_polling());
        assert_eq!(*states.borrow_and_update(), ControllerState::Denied);

        // Terminal: no further requests, no second notice
        assert_eq!(ctl.check_access().await, CheckOutcome::AlreadyDenied);
        tokio::time::sleep(FIVE_MINUTES * 2).await;
        assert_eq!(api.checks.load(Ordering::SeqCst), 2);
        assert_eq!(view.events().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_treated_as_offline() {
        let config = ControllerConfig::default().with_base_url("http://127.0.0.1:9");
        let api = Arc::new(HttpAccessApi::new(&config).unwrap());
        let view = Arc::new(RecordingView::default());
        let ctl = AccessController::new(api, view.clone(), DeviceIdentity::from("device_offline01"), config);

        let outcome = ctl.check_access().await;

        assert!(matches!(outcome, CheckOutcome::Skipped(_)));
        assert_eq!(ctl.state(), ControllerState::Initializing);
        assert!(view.events().is_empty());
    }
}
