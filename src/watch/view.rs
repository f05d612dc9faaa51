use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::poller::PollTask;
use super::ticker::{Countdown, CountdownState};
use crate::config::WatchConfig;
use crate::error::AppResult;
use crate::external::DspiceApi;
use crate::models::{Rental, RentalKind, RentalViewSnapshot, VerificationMessage};
use crate::utils::{Clock, format_remaining};

pub const NO_CODE_FOUND: &str = "No code found";

/// Where a view gets its verification messages from.
#[async_trait]
pub trait CodeSource: Send + Sync {
    async fn fetch_codes(&self, kind: RentalKind, id: &str) -> AppResult<Vec<VerificationMessage>>;
}

#[async_trait]
impl CodeSource for DspiceApi {
    async fn fetch_codes(&self, kind: RentalKind, id: &str) -> AppResult<Vec<VerificationMessage>> {
        DspiceApi::fetch_codes(self, kind, id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// Published once, when the countdown reaches zero.
    Expired,
    MessagesUpdated(usize),
}

struct ViewShared {
    kind: RentalKind,
    id: String,
    closed: AtomicBool,
    messages: Mutex<Vec<VerificationMessage>>,
    poll_note: Mutex<Option<String>>,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewShared {
    fn apply(&self, messages: Vec<VerificationMessage>) {
        // 视图关闭后到达的响应直接丢弃
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let count = messages.len();
        if let Ok(mut note) = self.poll_note.lock() {
            *note = (count == 0).then(|| NO_CODE_FOUND.to_string());
        }
        let changed = match self.messages.lock() {
            Ok(mut current) => {
                let changed = *current != messages;
                *current = messages;
                changed
            }
            Err(_) => false,
        };
        if changed {
            let _ = self.events.send(ViewEvent::MessagesUpdated(count));
        }
    }

    fn note_failure(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(mut note) = self.poll_note.lock() {
            *note = Some(NO_CODE_FOUND.to_string());
        }
    }

    /// Background fetch: failures only show up as the poll note.
    async fn poll_once(&self, source: &dyn CodeSource) {
        match source.fetch_codes(self.kind, &self.id).await {
            Ok(messages) => self.apply(messages),
            Err(e) => {
                log::debug!("Polling codes for {} {} failed: {e}", self.kind, self.id);
                self.note_failure();
            }
        }
    }
}

/// Live state of one open rental dialog: countdown, background poller and received messages.
pub struct RentalView {
    rental: RwLock<Rental>,
    countdown: Countdown,
    poller: Arc<PollTask>,
    shared: Arc<ViewShared>,
    source: Arc<dyn CodeSource>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl RentalView {
    /// Open a view: start the countdown, fetch codes once in the background and, while the
    /// rental is counting, poll for new codes.
    pub fn open(
        rental: Rental,
        source: Arc<dyn CodeSource>,
        clock: Arc<dyn Clock>,
        config: &WatchConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        let shared = Arc::new(ViewShared {
            kind: rental.kind,
            id: rental.id.clone(),
            closed: AtomicBool::new(false),
            messages: Mutex::new(Vec::new()),
            poll_note: Mutex::new(None),
            events,
        });

        let view = Arc::new(Self {
            countdown: Countdown::new(),
            poller: Arc::new(PollTask::new(config.poll_interval())),
            shared,
            source,
            monitor: Mutex::new(None),
            rental: RwLock::new(rental.clone()),
        });

        // 先订阅再启动，避免错过很快到来的 Expired
        let countdown_rx = view.countdown.subscribe();
        view.countdown
            .start(rental.expiry_source(), clock, config.tick_interval());

        {
            let shared = view.shared.clone();
            let source = view.source.clone();
            tokio::spawn(async move {
                shared.poll_once(source.as_ref()).await;
            });
        }

        if view.countdown.current().is_counting() {
            let shared = view.shared.clone();
            let source = view.source.clone();
            view.poller.start(move || {
                let shared = shared.clone();
                let source = source.clone();
                async move {
                    shared.poll_once(source.as_ref()).await;
                }
            });
            view.spawn_monitor(countdown_rx);
        }

        log::debug!(
            "Opened view for {} {} ({:?})",
            rental.kind,
            rental.id,
            view.countdown.current().phase()
        );
        view
    }

    /// Stop the poller and announce expiry when the countdown leaves `Counting`.
    fn spawn_monitor(&self, mut rx: watch::Receiver<CountdownState>) {
        let poller = self.poller.clone();
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                if state.is_counting() {
                    continue;
                }
                poller.stop();
                if state == CountdownState::Expired {
                    log::info!("Rental {} {} expired", shared.kind, shared.id);
                    let _ = shared.events.send(ViewEvent::Expired);
                }
                break;
            }
        });
        if let Ok(mut guard) = self.monitor.lock() {
            *guard = Some(handle);
        }
    }

    pub fn kind(&self) -> RentalKind {
        self.shared.kind
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn rental(&self) -> Rental {
        match self.rental.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.shared.events.subscribe()
    }

    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.current()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn messages(&self) -> Vec<VerificationMessage> {
        self.shared
            .messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Foreground fetch. Errors go back to the caller.
    pub async fn reload(&self) -> AppResult<Vec<VerificationMessage>> {
        let messages = self.source.fetch_codes(self.kind(), self.id()).await?;
        self.shared.apply(messages.clone());
        Ok(messages)
    }

    pub fn snapshot(&self) -> RentalViewSnapshot {
        let rental = self.rental();
        let state = self.countdown.current();
        let remaining = state.remaining_secs();
        RentalViewSnapshot {
            can_reactivate: rental.can_reactivate,
            rental,
            phase: state.phase(),
            remaining_secs: remaining,
            remaining_display: format_remaining(remaining),
            messages: self.messages(),
            poll_note: self.shared.poll_note.lock().ok().and_then(|n| n.clone()),
            cooldown_remaining_secs: 0,
        }
    }

    /// Stop all timers. In-flight fetches are left to finish and their results are dropped.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.countdown.stop();
        self.poller.stop();
        let monitor = match self.monitor.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = monitor {
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl Drop for RentalView {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{CountdownPhase, RentalStatus};
    use crate::utils::{AnchoredClock, TimeRef, lagos};
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Scripted code source; fails every call when `fail` is set.
    pub(crate) struct FakeCodes {
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
        pub messages: Mutex<Vec<VerificationMessage>>,
    }

    impl FakeCodes {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                messages: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CodeSource for FakeCodes {
        async fn fetch_codes(&self, _: RentalKind, _: &str) -> AppResult<Vec<VerificationMessage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::ExternalApiError("boom".into()));
            }
            Ok(self.messages.lock().unwrap().clone())
        }
    }

    fn rental(duration_secs: i64, start: chrono::DateTime<chrono::FixedOffset>) -> Rental {
        Rental {
            id: "r1".into(),
            kind: RentalKind::Number,
            contact: "+2348012345678".into(),
            owner: None,
            started_at: Some(TimeRef::Epoch(start.timestamp())),
            duration_secs: Some(duration_secs),
            expires_at: None,
            status: RentalStatus::Active,
            service: Some("WhatsApp".into()),
            country: Some("Nigeria".into()),
            network: None,
            can_reactivate: false,
        }
    }

    fn config() -> WatchConfig {
        WatchConfig {
            tick_interval_ms: 1000,
            poll_interval_secs: 30,
            reactivation_cooldown_secs: 180,
        }
    }

    fn sms(text: &str) -> VerificationMessage {
        VerificationMessage {
            sender: Some("WhatsApp".into()),
            text: text.into(),
            code: crate::utils::extract_code(text),
            received_at: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_event_fires_exactly_once() {
        let start = lagos().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(start));
        let codes = FakeCodes::new();

        let view = RentalView::open(rental(3, start), codes.clone(), clock, &config());
        let mut events = view.subscribe();
        assert!(view.is_polling());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(view.countdown_state(), CountdownState::Expired);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let mut expired = 0;
        while let Ok(event) = events.try_recv() {
            if event == ViewEvent::Expired {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        assert!(!view.is_polling());
        // 只有打开时的一次拉取，过期后不再轮询
        assert_eq!(codes.calls.load(Ordering::SeqCst), 1);

        let snap = view.snapshot();
        assert_eq!(snap.phase, CountdownPhase::Expired);
        assert_eq!(snap.remaining_display, "Expired");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_expiry_right_after_open_still_stops_poller() {
        let clock: Arc<dyn Clock> = Arc::new(crate::utils::SystemClock);
        let config = WatchConfig {
            tick_interval_ms: 1,
            ..config()
        };
        let codes = FakeCodes::new();

        // 剩余一到两秒且每毫秒重算，计时任务可能在监视任务运行前就发布 Expired
        let views: Vec<_> = (0..20)
            .map(|_| {
                RentalView::open(rental(2, clock.now()), codes.clone(), clock.clone(), &config)
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        for view in &views {
            assert_eq!(view.countdown_state(), CountdownState::Expired);
            assert!(!view.is_polling());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_is_swallowed() {
        let start = lagos().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(start));
        let codes = FakeCodes::new();
        codes.fail.store(true, Ordering::SeqCst);

        let view = RentalView::open(rental(600, start), codes.clone(), clock, &config());
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(codes.calls.load(Ordering::SeqCst), 2);
        let snap = view.snapshot();
        assert_eq!(snap.poll_note.as_deref(), Some(NO_CODE_FOUND));
        assert_eq!(snap.phase, CountdownPhase::Counting);
        assert!(view.is_polling());

        // 前台刷新把错误交给调用方
        assert!(view.reload().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_picks_up_new_code() {
        let start = lagos().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(start));
        let codes = FakeCodes::new();

        let view = RentalView::open(rental(600, start), codes.clone(), clock, &config());
        let mut events = view.subscribe();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(view.snapshot().poll_note.as_deref(), Some(NO_CODE_FOUND));

        codes
            .messages
            .lock()
            .unwrap()
            .push(sms("Your WhatsApp code is 482-913"));
        tokio::time::sleep(Duration::from_secs(30)).await;

        let snap = view.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].code.as_deref(), Some("482913"));
        assert!(snap.poll_note.is_none());
        assert_eq!(events.try_recv().unwrap(), ViewEvent::MessagesUpdated(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_timers_and_ignores_late_results() {
        let start = lagos().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(start));
        let codes = FakeCodes::new();
        codes.messages.lock().unwrap().push(sms("code 1234"));

        let view = RentalView::open(rental(600, start), codes.clone(), clock, &config());
        // 初始拉取尚未执行就关闭
        view.close();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(view.is_closed());
        assert!(!view.is_polling());
        assert!(view.messages().is_empty());
        assert!(codes.calls.load(Ordering::SeqCst) <= 1);
    }
}
