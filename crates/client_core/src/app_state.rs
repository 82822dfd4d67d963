//! Shared application state handed to each screen explicitly.

use std::sync::Arc;

use serde::Serialize;
use shared::domain::{minutes_rounded_up, UserProfile, UserUid};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{error::ReportFetchError, ScoreClient};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub user_profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanUsage {
    pub is_free_plan: bool,
    pub total_seconds: u64,
    pub used_seconds: u64,
    pub total_minutes: u64,
    pub used_minutes: u64,
}

impl AppState {
    pub fn plan_usage(&self) -> PlanUsage {
        let Some(profile) = &self.user_profile else {
            return PlanUsage::default();
        };
        let total_seconds = profile.total_seconds();
        let used_seconds = profile.used_seconds();
        PlanUsage {
            is_free_plan: profile.is_free_plan(),
            total_seconds,
            used_seconds,
            total_minutes: minutes_rounded_up(total_seconds),
            used_minutes: minutes_rounded_up(used_seconds),
        }
    }
}

/// Cloneable handle; every clone reads and writes the same state.
#[derive(Clone)]
pub struct AppStateStore {
    tx: Arc<watch::Sender<AppState>>,
}

impl Default for AppStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStateStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AppState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn user_profile(&self) -> Option<UserProfile> {
        self.tx.borrow().user_profile.clone()
    }

    pub fn plan_usage(&self) -> PlanUsage {
        self.tx.borrow().plan_usage()
    }

    pub fn set_user_profile(&self, profile: Option<UserProfile>) {
        self.tx.send_modify(|state| state.user_profile = profile);
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Reloads the profile from the backend. On failure the stored profile is
    /// left untouched.
    pub async fn refresh_profile(
        &self,
        client: &ScoreClient,
        uid: &UserUid,
    ) -> Result<UserProfile, ReportFetchError> {
        match client.fetch_user_profile(uid).await {
            Ok(profile) => {
                info!(uid = %uid, "app state: user profile refreshed");
                self.set_user_profile(Some(profile.clone()));
                Ok(profile)
            }
            Err(err) => {
                warn!(uid = %uid, "app state: failed to fetch user profile: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::Plan;

    fn profile(plan_id: i64) -> UserProfile {
        UserProfile {
            uid: UserUid::new("uid-1"),
            name: Some("Ada".into()),
            plan: Some(Plan {
                id: plan_id,
                name: None,
                free_seconds: Some(600),
                total_seconds: Some(3_601),
            }),
            free_seconds_used_today: Some(61),
            seconds_used: Some(1_200),
        }
    }

    #[test]
    fn empty_store_reports_zero_usage() {
        let store = AppStateStore::new();
        assert_eq!(store.plan_usage(), PlanUsage::default());
        assert!(store.user_profile().is_none());
    }

    #[test]
    fn free_plan_uses_daily_free_seconds() {
        let store = AppStateStore::new();
        store.set_user_profile(Some(profile(1)));

        let usage = store.plan_usage();
        assert!(usage.is_free_plan);
        assert_eq!(usage.total_seconds, 600);
        assert_eq!(usage.used_seconds, 61);
        assert_eq!(usage.total_minutes, 10);
        assert_eq!(usage.used_minutes, 2);
    }

    #[test]
    fn paid_plan_uses_total_seconds_and_rounds_up() {
        let store = AppStateStore::new();
        store.set_user_profile(Some(profile(3)));

        let usage = store.plan_usage();
        assert!(!usage.is_free_plan);
        assert_eq!(usage.total_seconds, 3_601);
        assert_eq!(usage.used_seconds, 1_200);
        assert_eq!(usage.total_minutes, 61);
        assert_eq!(usage.used_minutes, 20);
    }

    #[tokio::test]
    async fn clones_share_state_and_notify_subscribers() {
        let store = AppStateStore::new();
        let screen_handle = store.clone();
        let mut rx = store.subscribe();

        screen_handle.set_user_profile(Some(profile(1)));

        rx.changed().await.expect("change notification");
        assert_eq!(
            rx.borrow().user_profile.as_ref().map(|p| p.uid.as_str()),
            Some("uid-1")
        );
        assert_eq!(store.user_profile(), Some(profile(1)));
    }
}
