// HTTP client for the hosted backend's function API.
//
// Queries and mutations are POSTed as `{"path", "args", "format": "json"}` to
// `/api/query` and `/api/mutation`. The response body is an envelope with a
// `status` of "success" (carrying `value`) or "error" (carrying
// `errorMessage`). Calls are attempted once; there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use playerport_core::backend::{BackendError, ClubBackend};
use playerport_core::model::{NewPlayer, NewTeam, PlayerId, Team, TeamId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

// ---------------------------------------------------------------------------
// Function paths
// ---------------------------------------------------------------------------

pub const LIST_TEAMS_PATH: &str = "models/teams:getTeamsByOrganization";
pub const CREATE_TEAM_PATH: &str = "models/teams:createTeam";
pub const CREATE_PLAYER_PATH: &str = "models/players:createPlayer";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Query,
    Mutation,
}

impl CallKind {
    fn endpoint(self) -> &'static str {
        match self {
            CallKind::Query => "api/query",
            CallKind::Mutation => "api/mutation",
        }
    }
}

/// Response envelope of a function call.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope {
    Success {
        value: Value,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Deployment base URL, e.g. `https://example.convex.cloud`.
    pub url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: HttpConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.filter(|t| !t.is_empty()),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        kind: CallKind,
        path: &str,
        args: Value,
    ) -> Result<T, BackendError> {
        let url = format!("{}/{}", self.base_url, kind.endpoint());
        let body = json!({ "path": path, "args": args, "format": "json" });

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        debug!(%path, ?kind, "calling backend function");
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        decode_envelope(status, &text)
    }
}

/// Interpret a function-call response. Error envelopes are honoured whatever
/// the HTTP status; a body that is not an envelope is a transport failure on
/// a non-success status and a decode failure otherwise.
fn decode_envelope<T: DeserializeOwned>(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<T, BackendError> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope::Success { value }) => {
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))
        }
        Ok(Envelope::Error { error_message }) => Err(BackendError::Remote {
            message: error_message,
        }),
        Err(_) if !status.is_success() => {
            Err(BackendError::Transport(format!("HTTP {status}: {}", body.trim())))
        }
        Err(e) => Err(BackendError::Decode(e.to_string())),
    }
}

fn to_args<T: serde::Serialize>(value: &T) -> Result<Value, BackendError> {
    serde_json::to_value(value).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl ClubBackend for HttpBackend {
    async fn list_teams(&self, organization_id: &str) -> Result<Vec<Team>, BackendError> {
        self.call(
            CallKind::Query,
            LIST_TEAMS_PATH,
            json!({ "organizationId": organization_id }),
        )
        .await
    }

    async fn create_team(&self, team: &NewTeam) -> Result<TeamId, BackendError> {
        self.call(CallKind::Mutation, CREATE_TEAM_PATH, to_args(team)?)
            .await
    }

    async fn create_player(&self, player: &NewPlayer) -> Result<PlayerId, BackendError> {
        self.call(CallKind::Mutation, CREATE_PLAYER_PATH, to_args(player)?)
            .await
    }
}
