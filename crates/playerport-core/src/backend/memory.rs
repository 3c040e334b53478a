// In-process backend. Backs tests and dry runs; supports injecting failures
// for specific create calls.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{BackendError, ClubBackend};
use crate::model::{NewPlayer, NewTeam, PlayerId, Team, TeamId};

#[derive(Default)]
pub struct MemoryBackend {
    teams: Mutex<Vec<(String, Team)>>,
    players: Mutex<Vec<(PlayerId, NewPlayer)>>,
    next_id: AtomicUsize,
    /// 1-based create_player call numbers that fail.
    failing_player_calls: Mutex<HashSet<usize>>,
    /// 1-based create_team call numbers that fail.
    failing_team_calls: Mutex<HashSet<usize>>,
    player_calls: AtomicUsize,
    team_calls: AtomicUsize,
    failing_list: AtomicBool,
    delay: Option<Duration>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every create call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Seed an existing team for `organization_id`.
    pub async fn add_team(&self, organization_id: &str, team: Team) {
        self.teams
            .lock()
            .await
            .push((organization_id.to_string(), team));
    }

    /// Make the `n`th create_player call (1-based) fail.
    pub async fn fail_player_call(&self, n: usize) {
        self.failing_player_calls.lock().await.insert(n);
    }

    /// Make the `n`th create_team call (1-based) fail.
    pub async fn fail_team_call(&self, n: usize) {
        self.failing_team_calls.lock().await.insert(n);
    }

    /// Make every list_teams call fail while `fail` is set.
    pub fn fail_list_teams(&self, fail: bool) {
        self.failing_list.store(fail, Ordering::SeqCst);
    }

    pub async fn players(&self) -> Vec<NewPlayer> {
        self.players
            .lock()
            .await
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn player_calls(&self) -> usize {
        self.player_calls.load(Ordering::SeqCst)
    }

    pub fn team_calls(&self) -> usize {
        self.team_calls.load(Ordering::SeqCst)
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_{n}")
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ClubBackend for MemoryBackend {
    async fn list_teams(&self, organization_id: &str) -> Result<Vec<Team>, BackendError> {
        if self.failing_list.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("injected failure listing teams".into()));
        }
        Ok(self
            .teams
            .lock()
            .await
            .iter()
            .filter(|(org, _)| org == organization_id)
            .map(|(_, team)| team.clone())
            .collect())
    }

    async fn create_team(&self, team: &NewTeam) -> Result<TeamId, BackendError> {
        let call = self.team_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        if self.failing_team_calls.lock().await.contains(&call) {
            return Err(BackendError::Remote {
                message: format!("injected failure creating team {}", team.name),
            });
        }

        let id = self.next_id("team");
        self.teams.lock().await.push((
            team.organization_id.clone(),
            Team {
                id: id.clone(),
                name: team.name.clone(),
                sport: Some(team.sport.clone()),
                age_group: Some(team.age_group.clone()),
                gender: Some(team.gender.to_string()),
                season: Some(team.season.clone()),
                is_active: Some(team.is_active),
            },
        ));
        Ok(id)
    }

    async fn create_player(&self, player: &NewPlayer) -> Result<PlayerId, BackendError> {
        let call = self.player_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        if self.failing_player_calls.lock().await.contains(&call) {
            return Err(BackendError::Remote {
                message: format!("injected failure creating player {}", player.name),
            });
        }

        let id = self.next_id("player");
        self.players.lock().await.push((id.clone(), player.clone()));
        Ok(id)
    }
}
