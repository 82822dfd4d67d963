//! View model for the after-guess score reveal.

use std::sync::Arc;

use serde::Serialize;
use shared::domain::{MeetingId, PollStatus};
use tracing::info;

use crate::{
    error::PollerError,
    guess::{judge_guess, GuessVerdict},
    poller::{PollSnapshot, ScorePoller},
};

const ERROR_MESSAGE: &str = "Error while creating the report.";
const TIMEOUT_MESSAGE: &str = "Your report is taking longer than expected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalAction {
    Next,
    Close,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRevealView {
    pub guessed_range: String,
    pub headline: &'static str,
    pub subtitle: &'static str,
    pub detail: Option<String>,
    /// Progress ring; it holds the final score once the report is ready.
    pub show_progress: bool,
    pub verdict: GuessVerdict,
    pub actions: Vec<ModalAction>,
    pub snapshot: PollSnapshot,
}

pub struct ScoreRevealModal {
    poller: Arc<ScorePoller>,
    guessed_range: String,
    allow_retry: bool,
    open_meeting: Option<MeetingId>,
}

impl ScoreRevealModal {
    pub fn new(poller: Arc<ScorePoller>, guessed_range: impl Into<String>) -> Self {
        Self {
            poller,
            guessed_range: guessed_range.into(),
            allow_retry: true,
            open_meeting: None,
        }
    }

    /// Hides the retry action, leaving close as the only way out of a failure.
    pub fn without_retry(mut self) -> Self {
        self.allow_retry = false;
        self
    }

    pub fn poller(&self) -> Arc<ScorePoller> {
        Arc::clone(&self.poller)
    }

    pub fn is_open(&self) -> bool {
        self.open_meeting.is_some()
    }

    /// Shows the modal for `meeting_id`. Polling restarts only when the modal
    /// was hidden or the meeting changed.
    pub async fn open(&mut self, meeting_id: MeetingId) -> PollSnapshot {
        if self.open_meeting.as_ref() == Some(&meeting_id) {
            return self.poller.snapshot().await;
        }
        info!(meeting_id = %meeting_id, "score reveal: opened");
        self.open_meeting = Some(meeting_id.clone());
        self.poller.start(meeting_id).await
    }

    pub async fn close(&mut self) {
        self.poller.stop().await;
        if let Some(meeting_id) = self.open_meeting.take() {
            info!(meeting_id = %meeting_id, "score reveal: closed");
        }
    }

    pub async fn retry(&mut self) -> Result<PollSnapshot, PollerError> {
        if self.open_meeting.is_none() {
            return Err(PollerError::NoSession);
        }
        self.poller.retry().await
    }

    /// Closes the modal and hands back the final score, if any.
    pub async fn next(&mut self) -> Option<f64> {
        let score = self.poller.snapshot().await.result();
        self.close().await;
        score
    }

    pub async fn view(&self) -> ScoreRevealView {
        let snapshot = self.poller.snapshot().await;
        let verdict = judge_guess(&self.guessed_range, snapshot.result());
        let guessed_range = if self.guessed_range.is_empty() {
            "—".to_string()
        } else {
            self.guessed_range.clone()
        };

        let failure_actions = || {
            let mut actions = vec![ModalAction::Close];
            if self.allow_retry {
                actions.push(ModalAction::Retry);
            }
            actions
        };

        let (headline, subtitle, detail, show_progress, actions) = match &snapshot.status {
            PollStatus::Polling => (
                "Keep going",
                "We're calculating your real score...",
                Some("Processing your interview data".to_string()),
                true,
                Vec::new(),
            ),
            PollStatus::Ready { score } => {
                let correct = verdict == GuessVerdict::Correct;
                let detail = if correct {
                    "Nice job. Your guess was correct.".to_string()
                } else {
                    format!("Your guess was not correct. Final score {score}%")
                };
                (
                    if correct { "Great guess" } else { "Wrong guess" },
                    "Here is your final score",
                    Some(detail),
                    true,
                    vec![ModalAction::Next],
                )
            }
            PollStatus::Error { .. } => (
                "Keep going",
                "We're calculating your real score...",
                Some(ERROR_MESSAGE.to_string()),
                false,
                failure_actions(),
            ),
            PollStatus::Timeout => (
                "Keep going",
                "We're calculating your real score...",
                Some(TIMEOUT_MESSAGE.to_string()),
                false,
                failure_actions(),
            ),
        };

        ScoreRevealView {
            guessed_range,
            headline,
            subtitle,
            detail,
            show_progress,
            verdict,
            actions,
            snapshot,
        }
    }
}

#[cfg(test)]
#[path = "tests/modal_tests.rs"]
mod tests;
