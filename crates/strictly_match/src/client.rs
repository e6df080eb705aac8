//! HTTP client for a remote authoritative store.

use crate::authority::{
    ControlReceipt, ControlRequest, CreatedMatch, JoinedMatch, MatchAuthority, MoveReceipt,
    MoveRequest, SeatRequest, StatusSnapshot,
};
use crate::error::{MatchError, MatchErrorKind, MatchResult};
use crate::session::{ControlAction, MatchId, Participant};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use strictly_chess::Move;
use tracing::{debug, instrument, warn};

/// [`MatchAuthority`] over the REST surface.
///
/// Transport failures and unexpected statuses become
/// `CollaboratorUnavailable`; a 404 becomes `MatchNotFound`.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthority {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// `CollaboratorUnavailable` if the HTTP client cannot be built.
    #[instrument(skip(base_url), fields(base_url = %base_url.as_ref()))]
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> MatchResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> MatchResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(path, response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> MatchResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> MatchResult<T> {
        let status = response.status();
        debug!(path, %status, "Response received");
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MatchError::new(
                MatchErrorKind::MatchNotFound,
                format!("{path} not found"),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(path, %status, body = %body, "Request failed");
            let kind = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| serde_json::from_value::<MatchErrorKind>(v["error"].clone()).ok())
                .unwrap_or(MatchErrorKind::CollaboratorUnavailable);
            return Err(MatchError::new(kind, format!("{path} returned {status}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MatchAuthority for HttpAuthority {
    #[instrument(skip(self, host), fields(host = %host.id))]
    async fn create_match(&self, host: Participant) -> MatchResult<CreatedMatch> {
        self.post("/api/matches", &SeatRequest::from(&host)).await
    }

    #[instrument(skip(self, joiner), fields(joiner = %joiner.id))]
    async fn join_match(
        &self,
        match_id: MatchId,
        joiner: Participant,
    ) -> MatchResult<JoinedMatch> {
        self.post(
            &format!("/api/matches/{match_id}/join"),
            &SeatRequest::from(&joiner),
        )
        .await
    }

    #[instrument(skip(self, mv), fields(mv = %mv))]
    async fn submit_move(
        &self,
        match_id: MatchId,
        actor: &str,
        mv: Move,
    ) -> MatchResult<MoveReceipt> {
        self.post(
            &format!("/api/matches/{match_id}/moves"),
            &MoveRequest::new(actor, &mv),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_status(&self, match_id: MatchId) -> MatchResult<StatusSnapshot> {
        self.get(&format!("/api/matches/{match_id}/status")).await
    }

    #[instrument(skip(self))]
    async fn control_action(
        &self,
        match_id: MatchId,
        actor: &str,
        action: ControlAction,
    ) -> MatchResult<ControlReceipt> {
        self.post(
            &format!("/api/matches/{match_id}/control"),
            &ControlRequest::new(actor.to_string(), action),
        )
        .await
    }
}

impl HttpAuthority {
    /// Creates a match against the server's automated opponent.
    ///
    /// # Errors
    ///
    /// As for [`MatchAuthority::create_match`].
    #[instrument(skip(self, host), fields(host = %host.id))]
    pub async fn create_automated_match(&self, host: &Participant) -> MatchResult<CreatedMatch> {
        self.post("/api/matches/automated", &SeatRequest::from(host))
            .await
    }
}
