use super::*;

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use shared::protocol::ReportStatus;
use tokio::sync::Mutex;

use crate::{poller::PollConfig, ReportSource};

struct QueuedSource {
    responses: Mutex<VecDeque<ReportStatus>>,
}

impl QueuedSource {
    fn new(responses: Vec<ReportStatus>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl ReportSource for QueuedSource {
    async fn fetch_report(&self, _meeting_id: &MeetingId) -> anyhow::Result<ReportStatus> {
        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or(ReportStatus::Processing))
    }
}

fn modal_with(responses: Vec<ReportStatus>, max_attempts: u32, guess: &str) -> ScoreRevealModal {
    let poller = ScorePoller::new(
        QueuedSource::new(responses),
        PollConfig::new(max_attempts, Duration::from_secs(60)).expect("config"),
    );
    ScoreRevealModal::new(poller, guess)
}

#[tokio::test]
async fn polling_view_shows_progress_without_actions() {
    let mut modal = modal_with(Vec::new(), 5, "50%-75%");

    modal.open(MeetingId::new("m-1")).await;
    let view = modal.view().await;

    assert!(modal.is_open());
    assert_eq!(view.headline, "Keep going");
    assert_eq!(view.subtitle, "We're calculating your real score...");
    assert!(view.show_progress);
    assert!(view.actions.is_empty());
    assert_eq!(view.verdict, GuessVerdict::Pending);
    assert_eq!(view.guessed_range, "50%-75%");

    modal.close().await;
    assert!(!modal.is_open());
}

#[tokio::test]
async fn correct_guess_is_celebrated() {
    let mut modal = modal_with(vec![ReportStatus::Ready { score: 72.0 }], 5, "50%-75%");

    modal.open(MeetingId::new("m-1")).await;
    let view = modal.view().await;

    assert_eq!(view.headline, "Great guess");
    assert_eq!(view.subtitle, "Here is your final score");
    assert_eq!(
        view.detail.as_deref(),
        Some("Nice job. Your guess was correct.")
    );
    assert!(view.show_progress);
    assert_eq!(view.snapshot.result(), Some(72.0));
    assert_eq!(view.verdict, GuessVerdict::Correct);
    assert_eq!(view.actions, vec![ModalAction::Next]);
    assert_eq!(modal.next().await, Some(72.0));
    assert!(!modal.is_open());
}

#[tokio::test]
async fn wrong_guess_reports_final_score() {
    let mut modal = modal_with(vec![ReportStatus::Ready { score: 72.0 }], 5, "0%-25%");

    modal.open(MeetingId::new("m-1")).await;
    let view = modal.view().await;

    assert_eq!(view.headline, "Wrong guess");
    assert_eq!(
        view.detail.as_deref(),
        Some("Your guess was not correct. Final score 72%")
    );
    assert_eq!(view.verdict, GuessVerdict::Incorrect);
}

#[tokio::test]
async fn error_and_timeout_use_distinct_copy_and_offer_retry() {
    let mut failing = modal_with(
        vec![ReportStatus::Failed {
            message: "boom".into(),
        }],
        5,
        "",
    );
    failing.open(MeetingId::new("m-1")).await;
    let view = failing.view().await;
    assert_eq!(view.detail.as_deref(), Some(ERROR_MESSAGE));
    assert_eq!(view.actions, vec![ModalAction::Close, ModalAction::Retry]);
    assert_eq!(view.guessed_range, "—");
    assert!(!view.show_progress);

    let mut slow = modal_with(Vec::new(), 1, "25%-50%").without_retry();
    slow.open(MeetingId::new("m-2")).await;
    let view = slow.view().await;
    assert_eq!(view.detail.as_deref(), Some(TIMEOUT_MESSAGE));
    assert_eq!(view.actions, vec![ModalAction::Close]);
}

#[tokio::test]
async fn retry_from_failure_polls_again() {
    let mut modal = modal_with(
        vec![
            ReportStatus::Failed {
                message: "boom".into(),
            },
            ReportStatus::Ready { score: 30.0 },
        ],
        5,
        "25%-50%",
    );

    modal.open(MeetingId::new("m-1")).await;
    let retried = modal.retry().await.expect("retry");

    assert_eq!(retried.status, PollStatus::Ready { score: 30.0 });
    assert_eq!(retried.attempts, 1);
    assert_eq!(modal.view().await.verdict, GuessVerdict::Correct);
}

#[tokio::test]
async fn retry_requires_an_open_modal() {
    let mut modal = modal_with(Vec::new(), 5, "25%-50%");
    assert!(matches!(modal.retry().await, Err(PollerError::NoSession)));
}

#[tokio::test]
async fn reopening_same_meeting_keeps_session_but_new_meeting_restarts() {
    let mut modal = modal_with(Vec::new(), 5, "25%-50%");

    let first = modal.open(MeetingId::new("m-1")).await;
    let same = modal.open(MeetingId::new("m-1")).await;
    assert_eq!(first.session, same.session);
    assert_eq!(same.attempts, 1);

    let switched = modal.open(MeetingId::new("m-2")).await;
    assert_eq!(switched.session, first.session + 1);
    assert_eq!(switched.meeting_id, Some(MeetingId::new("m-2")));

    modal.close().await;
    let after_close = modal.open(MeetingId::new("m-2")).await;
    assert_eq!(after_close.session, switched.session + 1);
    modal.close().await;
}
