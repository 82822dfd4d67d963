use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PollFailure;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(MeetingId);
id_newtype!(UserUid);

/// Four-state status of a score polling session.
///
/// The score only exists on `Ready`, so "result is set iff ready" holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollStatus {
    Polling,
    Ready { score: f64 },
    Error { failure: PollFailure },
    Timeout,
}

impl PollStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollStatus::Polling)
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            PollStatus::Ready { score } => Some(*score),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PollStatus::Polling => "polling",
            PollStatus::Ready { .. } => "ready",
            PollStatus::Error { .. } => "error",
            PollStatus::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub free_seconds: Option<u64>,
    #[serde(default)]
    pub total_seconds: Option<u64>,
}

pub const FREE_PLAN_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: UserUid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub free_seconds_used_today: Option<u64>,
    #[serde(default)]
    pub seconds_used: Option<u64>,
}

impl UserProfile {
    pub fn is_free_plan(&self) -> bool {
        self.plan.as_ref().map(|plan| plan.id) == Some(FREE_PLAN_ID)
    }

    pub fn total_seconds(&self) -> u64 {
        let Some(plan) = &self.plan else {
            return 0;
        };
        if self.is_free_plan() {
            plan.free_seconds.unwrap_or(0)
        } else {
            plan.total_seconds.unwrap_or(0)
        }
    }

    pub fn used_seconds(&self) -> u64 {
        if self.is_free_plan() {
            self.free_seconds_used_today.unwrap_or(0)
        } else {
            self.seconds_used.unwrap_or(0)
        }
    }
}

/// Whole minutes, rounded up.
pub fn minutes_rounded_up(seconds: u64) -> u64 {
    seconds.div_ceil(60)
}
