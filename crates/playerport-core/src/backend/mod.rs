// Backend seam: the organization's team and player records live behind this
// trait so the matcher and coordinator can run against a remote service, the
// local SQLite store, or an in-memory fake.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{NewPlayer, NewTeam, PlayerId, Team, TeamId};

pub use memory::MemoryBackend;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend rejected call: {message}")]
    Remote { message: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ClubBackend: Send + Sync {
    /// All teams of an organization, in the backend's list order.
    async fn list_teams(&self, organization_id: &str) -> Result<Vec<Team>, BackendError>;

    async fn create_team(&self, team: &NewTeam) -> Result<TeamId, BackendError>;

    async fn create_player(&self, player: &NewPlayer) -> Result<PlayerId, BackendError>;
}
