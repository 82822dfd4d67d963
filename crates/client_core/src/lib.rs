use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder};
use shared::{
    domain::{MeetingId, UserProfile, UserUid},
    protocol::{MeetingEnvelope, ReportStatus},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

pub mod app_state;
pub mod error;
pub mod guess;
pub mod modal;
pub mod poller;
pub mod settings;

pub use error::{PollConfigError, PollerError, ReportFetchError};
pub use poller::{PollConfig, PollEvent, PollSnapshot, ScorePoller, TransportErrorPolicy};

use settings::ClientSettings;

/// Source of meeting reports polled by [`ScorePoller`].
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_report(&self, meeting_id: &MeetingId) -> Result<ReportStatus>;
}

/// Signed-in identity attached to backend requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub uid: UserUid,
}

pub struct ScoreClient {
    http: Client,
    java_api_url: Url,
    api_url: Url,
    auth: RwLock<Option<AuthSession>>,
}

impl ScoreClient {
    pub fn new(settings: &ClientSettings) -> std::result::Result<Self, ReportFetchError> {
        Self::with_timeout(
            &settings.java_api_url,
            &settings.api_url,
            settings.request_timeout(),
        )
    }

    pub fn with_timeout(
        java_api_url: &str,
        api_url: &str,
        timeout: Duration,
    ) -> std::result::Result<Self, ReportFetchError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            java_api_url: Url::parse(java_api_url)?,
            api_url: Url::parse(api_url)?,
            auth: RwLock::new(None),
        })
    }

    pub async fn set_auth(&self, auth: Option<AuthSession>) {
        *self.auth.write().await = auth;
    }

    pub fn meeting_url(&self, meeting_id: &MeetingId) -> std::result::Result<Url, ReportFetchError> {
        endpoint(&self.java_api_url, &["api", "meetings", meeting_id.as_str()])
    }

    pub fn profile_url(&self, uid: &UserUid) -> std::result::Result<Url, ReportFetchError> {
        endpoint(&self.api_url, &["profiles", uid.as_str(), ""])
    }

    /// Fetches and classifies the report for one meeting.
    ///
    /// Non-2xx statuses are not failures on their own: the body decides, the
    /// same way a successful response does.
    pub async fn fetch_meeting_report(
        &self,
        meeting_id: &MeetingId,
    ) -> std::result::Result<ReportStatus, ReportFetchError> {
        let url = self.meeting_url(meeting_id)?;
        let response = self.authorized_get(url).await.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            warn!(
                meeting_id = %meeting_id,
                status = status.as_u16(),
                "meeting report endpoint returned a non-success status"
            );
        }

        let envelope: MeetingEnvelope = serde_json::from_slice(&body)?;
        let report = envelope.classify();
        debug!(meeting_id = %meeting_id, ?report, "meeting report fetched");
        Ok(report)
    }

    pub async fn fetch_user_profile(
        &self,
        uid: &UserUid,
    ) -> std::result::Result<UserProfile, ReportFetchError> {
        let url = self.profile_url(uid)?;
        let response = self.authorized_get(url.clone()).await.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReportFetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn authorized_get(&self, mut url: Url) -> RequestBuilder {
        let auth = self.auth.read().await.clone();
        let Some(auth) = auth else {
            return self.http.get(url);
        };
        url.query_pairs_mut().append_pair("uid", auth.uid.as_str());
        self.http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", auth.token))
    }
}

#[async_trait]
impl ReportSource for ScoreClient {
    async fn fetch_report(&self, meeting_id: &MeetingId) -> Result<ReportStatus> {
        Ok(self.fetch_meeting_report(meeting_id).await?)
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> std::result::Result<Url, ReportFetchError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ReportFetchError::NotABase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
