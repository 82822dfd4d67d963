//! Bounded polling of the meeting report endpoint until a score is ready.
//!
//! A session does one immediate attempt inside [`ScorePoller::start`], then a
//! single ticker task runs the remaining attempts, sleeping `interval` after
//! each attempt resolves. Attempts never overlap. Every state mutation checks
//! the session generation first, so results from a stopped or replaced
//! session are dropped.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{MeetingId, PollStatus},
    error::PollFailure,
    protocol::ReportStatus,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::{
    error::{PollConfigError, PollerError},
    ReportSource,
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What a failed fetch (network, decode) does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportErrorPolicy {
    /// Any transport failure ends the session in `Error`.
    #[default]
    Terminal,
    /// A transport failure uses up an attempt and polling continues. The
    /// session ends in `Error` if the last attempt fails this way.
    RetryWithinBudget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    max_attempts: u32,
    interval: Duration,
    transport_errors: TransportErrorPolicy,
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self, PollConfigError> {
        if max_attempts == 0 {
            return Err(PollConfigError::ZeroAttempts);
        }
        if interval.is_zero() {
            return Err(PollConfigError::ZeroInterval);
        }
        Ok(Self {
            max_attempts,
            interval,
            transport_errors: TransportErrorPolicy::default(),
        })
    }

    pub fn with_transport_errors(mut self, policy: TransportErrorPolicy) -> Self {
        self.transport_errors = policy;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn transport_errors(&self) -> TransportErrorPolicy {
        self.transport_errors
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
            transport_errors: TransportErrorPolicy::default(),
        }
    }
}

/// Point-in-time view of the current session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSnapshot {
    pub session: u64,
    pub meeting_id: Option<MeetingId>,
    #[serde(flatten)]
    pub status: PollStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PollSnapshot {
    pub fn result(&self) -> Option<f64> {
        self.status.score()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    AttemptClassified {
        session: u64,
        attempt: u32,
        status: PollStatus,
    },
    Stopped {
        session: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOutcome {
    Continue,
    Finished,
    Stale,
}

struct PollerState {
    session: u64,
    active: bool,
    meeting_id: Option<MeetingId>,
    attempts: u32,
    status: PollStatus,
    ticker: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl PollerState {
    fn is_current(&self, session: u64) -> bool {
        self.active && self.session == session
    }

    fn teardown(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        was_active
    }
}

pub struct ScorePoller {
    source: Arc<dyn ReportSource>,
    config: PollConfig,
    inner: Mutex<PollerState>,
    events: broadcast::Sender<PollEvent>,
}

impl ScorePoller {
    pub fn new(source: Arc<dyn ReportSource>, config: PollConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            source,
            config,
            inner: Mutex::new(PollerState {
                session: 0,
                active: false,
                meeting_id: None,
                attempts: 0,
                status: PollStatus::Polling,
                ticker: None,
                started_at: None,
                updated_at: None,
            }),
            events,
        })
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Starts a new session, tearing down any previous one first.
    ///
    /// The first attempt runs before this returns. The returned snapshot
    /// reflects that attempt unless another `start`/`stop` raced it.
    pub async fn start(self: &Arc<Self>, meeting_id: MeetingId) -> PollSnapshot {
        let session = {
            let mut guard = self.inner.lock().await;
            if guard.teardown() {
                let _ = self.events.send(PollEvent::Stopped {
                    session: guard.session,
                });
            }
            guard.session += 1;
            guard.active = true;
            guard.meeting_id = Some(meeting_id.clone());
            guard.attempts = 0;
            guard.status = PollStatus::Polling;
            guard.started_at = Some(Utc::now());
            guard.updated_at = guard.started_at;
            guard.session
        };
        info!(
            meeting_id = %meeting_id,
            session,
            max_attempts = self.config.max_attempts,
            interval_ms = duration_millis(self.config.interval),
            "score poll: session started"
        );

        let outcome = self.run_attempt(session).await;
        if outcome == AttemptOutcome::Continue && self.config.max_attempts > 1 {
            let mut guard = self.inner.lock().await;
            if guard.is_current(session) && !guard.status.is_terminal() {
                let poller = Arc::clone(self);
                guard.ticker = Some(tokio::spawn(async move {
                    poller.tick_loop(session).await;
                }));
            }
        }

        self.snapshot().await
    }

    /// Cancels the ticker and detaches the session. The status is left as is.
    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        if guard.teardown() {
            info!(
                session = guard.session,
                status = guard.status.label(),
                attempts = guard.attempts,
                "score poll: session stopped"
            );
            let _ = self.events.send(PollEvent::Stopped {
                session: guard.session,
            });
        }
    }

    /// Restarts polling for the most recent meeting id.
    pub async fn retry(self: &Arc<Self>) -> Result<PollSnapshot, PollerError> {
        let meeting_id = self
            .inner
            .lock()
            .await
            .meeting_id
            .clone()
            .ok_or(PollerError::NoSession)?;
        Ok(self.start(meeting_id).await)
    }

    pub async fn snapshot(&self) -> PollSnapshot {
        let guard = self.inner.lock().await;
        PollSnapshot {
            session: guard.session,
            meeting_id: guard.meeting_id.clone(),
            status: guard.status.clone(),
            attempts: guard.attempts,
            max_attempts: self.config.max_attempts,
            active: guard.active,
            started_at: guard.started_at,
            updated_at: guard.updated_at,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    pub fn event_stream(&self) -> BroadcastStream<PollEvent> {
        BroadcastStream::new(self.subscribe())
    }

    async fn tick_loop(self: Arc<Self>, session: u64) {
        loop {
            tokio::time::sleep(self.config.interval).await;
            if self.run_attempt(session).await != AttemptOutcome::Continue {
                break;
            }
        }
    }

    async fn run_attempt(&self, session: u64) -> AttemptOutcome {
        let meeting_id = {
            let mut guard = self.inner.lock().await;
            if !guard.is_current(session) {
                return AttemptOutcome::Stale;
            }
            if guard.attempts >= self.config.max_attempts {
                self.finish(&mut guard, PollStatus::Timeout);
                return AttemptOutcome::Finished;
            }
            match guard.meeting_id.clone() {
                Some(meeting_id) => meeting_id,
                None => return AttemptOutcome::Stale,
            }
        };

        let fetched = self.source.fetch_report(&meeting_id).await;

        let mut guard = self.inner.lock().await;
        if !guard.is_current(session) {
            debug!(
                meeting_id = %meeting_id,
                session,
                "score poll: dropping report from a stopped session"
            );
            return AttemptOutcome::Stale;
        }

        guard.attempts += 1;
        let attempt = guard.attempts;
        let status = self.classify(&meeting_id, attempt, fetched);
        debug!(
            meeting_id = %meeting_id,
            session,
            attempt,
            max_attempts = self.config.max_attempts,
            status = status.label(),
            "score poll: attempt classified"
        );

        if status.is_terminal() {
            self.finish(&mut guard, status);
            AttemptOutcome::Finished
        } else {
            guard.status = status.clone();
            guard.updated_at = Some(Utc::now());
            let _ = self.events.send(PollEvent::AttemptClassified {
                session,
                attempt,
                status,
            });
            AttemptOutcome::Continue
        }
    }

    fn classify(
        &self,
        meeting_id: &MeetingId,
        attempt: u32,
        fetched: anyhow::Result<ReportStatus>,
    ) -> PollStatus {
        let budget_spent = attempt >= self.config.max_attempts;
        match fetched {
            Ok(ReportStatus::Ready { score }) => PollStatus::Ready { score },
            Ok(ReportStatus::Failed { message }) => PollStatus::Error {
                failure: PollFailure::server(message),
            },
            Ok(ReportStatus::Processing) if budget_spent => PollStatus::Timeout,
            Ok(ReportStatus::Processing) => PollStatus::Polling,
            Err(err) => {
                warn!(
                    meeting_id = %meeting_id,
                    attempt,
                    "score poll: report fetch failed: {err:#}"
                );
                match self.config.transport_errors {
                    TransportErrorPolicy::RetryWithinBudget if !budget_spent => {
                        PollStatus::Polling
                    }
                    _ => PollStatus::Error {
                        failure: PollFailure::transport(format!("{err:#}")),
                    },
                }
            }
        }
    }

    // Runs either before the ticker exists or on the ticker itself, which
    // leaves its loop after a terminal attempt. Detach, never abort.
    fn finish(&self, guard: &mut PollerState, status: PollStatus) {
        guard.active = false;
        guard.ticker.take();
        guard.status = status.clone();
        guard.updated_at = Some(Utc::now());
        info!(
            meeting_id = guard.meeting_id.as_ref().map(MeetingId::as_str),
            session = guard.session,
            attempts = guard.attempts,
            status = status.label(),
            "score poll: session finished"
        );
        let _ = self.events.send(PollEvent::AttemptClassified {
            session: guard.session,
            attempt: guard.attempts,
            status,
        });
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
