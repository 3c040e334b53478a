// SQLite persistence: a local organization store (teams and players) that
// can stand in for the remote backend, plus the history of import runs.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::backend::{BackendError, ClubBackend};
use crate::coordinator::ImportSummary;
use crate::model::{NewPlayer, NewTeam, PlayerId, Team, TeamId};

/// One row of the `import_runs` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub organization_id: String,
    pub source: String,
    pub started_at: String,
    pub finished_at: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                organization_id TEXT NOT NULL,
                name            TEXT NOT NULL,
                sport           TEXT,
                age_group       TEXT,
                gender          TEXT,
                season          TEXT,
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_teams_org ON teams(organization_id);

            CREATE TABLE IF NOT EXISTS players (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                organization_id   TEXT NOT NULL,
                name              TEXT NOT NULL,
                age_group         TEXT NOT NULL,
                sport             TEXT NOT NULL,
                gender            TEXT NOT NULL,
                season            TEXT NOT NULL,
                date_of_birth     TEXT,
                address           TEXT,
                town              TEXT,
                postcode          TEXT,
                parent_first_name TEXT,
                parent_surname    TEXT,
                parent_email      TEXT,
                parent_phone      TEXT,
                created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS import_runs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                organization_id TEXT NOT NULL,
                source          TEXT NOT NULL,
                started_at      TEXT NOT NULL,
                finished_at     TEXT NOT NULL,
                total           INTEGER NOT NULL,
                succeeded       INTEGER NOT NULL,
                failed          INTEGER NOT NULL,
                skipped         INTEGER NOT NULL,
                cancelled       INTEGER NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Panics if the mutex is poisoned, which only happens if another thread
    /// panicked while holding the lock.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Teams and players
    // ------------------------------------------------------------------

    /// Teams of an organization in creation order.
    pub fn teams(&self, organization_id: &str) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, sport, age_group, gender, season, is_active
                 FROM teams WHERE organization_id = ?1 ORDER BY id",
            )
            .context("failed to prepare teams query")?;

        let teams = stmt
            .query_map(params![organization_id], |row| {
                let id: i64 = row.get(0)?;
                Ok(Team {
                    id: id.to_string(),
                    name: row.get(1)?,
                    sport: row.get(2)?,
                    age_group: row.get(3)?,
                    gender: row.get(4)?,
                    season: row.get(5)?,
                    is_active: Some(row.get(6)?),
                })
            })
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;

        Ok(teams)
    }

    pub fn insert_team(&self, team: &NewTeam) -> Result<TeamId> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO teams (organization_id, name, sport, age_group, gender, season, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING id",
                params![
                    team.organization_id,
                    team.name,
                    team.sport,
                    team.age_group,
                    team.gender.as_str(),
                    team.season,
                    team.is_active,
                ],
                |row| row.get(0),
            )
            .context("failed to insert team")?;
        Ok(id.to_string())
    }

    pub fn insert_player(&self, player: &NewPlayer) -> Result<PlayerId> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO players
                    (organization_id, name, age_group, sport, gender, season, date_of_birth,
                     address, town, postcode, parent_first_name, parent_surname, parent_email,
                     parent_phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 RETURNING id",
                params![
                    player.organization_id,
                    player.name,
                    player.age_group,
                    player.sport,
                    player.gender.as_str(),
                    player.season,
                    player.date_of_birth,
                    player.address,
                    player.town,
                    player.postcode,
                    player.parent_first_name,
                    player.parent_surname,
                    player.parent_email,
                    player.parent_phone,
                ],
                |row| row.get(0),
            )
            .context("failed to insert player")?;
        Ok(id.to_string())
    }

    pub fn player_count(&self, organization_id: &str) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM players WHERE organization_id = ?1",
                params![organization_id],
                |row| row.get(0),
            )
            .context("failed to count players")?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Import runs
    // ------------------------------------------------------------------

    /// Record the outcome of one import run. Returns the run id.
    pub fn record_run(
        &self,
        organization_id: &str,
        source: &str,
        started_at: DateTime<Utc>,
        summary: &ImportSummary,
    ) -> Result<i64> {
        let conn = self.conn();
        let finished_at = Utc::now();
        let id: i64 = conn
            .query_row(
                "INSERT INTO import_runs
                    (organization_id, source, started_at, finished_at, total, succeeded,
                     failed, skipped, cancelled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 RETURNING id",
                params![
                    organization_id,
                    source,
                    started_at.to_rfc3339(),
                    finished_at.to_rfc3339(),
                    summary.total as i64,
                    summary.succeeded as i64,
                    summary.failed as i64,
                    summary.skipped as i64,
                    summary.cancelled,
                ],
                |row| row.get(0),
            )
            .context("failed to record import run")?;
        Ok(id)
    }

    /// Most recent runs for an organization, newest first.
    pub fn recent_runs(&self, organization_id: &str, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, organization_id, source, started_at, finished_at, total,
                        succeeded, failed, skipped, cancelled
                 FROM import_runs WHERE organization_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )
            .context("failed to prepare recent_runs query")?;

        let runs = stmt
            .query_map(params![organization_id, limit as i64], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    organization_id: row.get(1)?,
                    source: row.get(2)?,
                    started_at: row.get(3)?,
                    finished_at: row.get(4)?,
                    total: row.get::<_, i64>(5)? as usize,
                    succeeded: row.get::<_, i64>(6)? as usize,
                    failed: row.get::<_, i64>(7)? as usize,
                    skipped: row.get::<_, i64>(8)? as usize,
                    cancelled: row.get(9)?,
                })
            })
            .context("failed to query import runs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map import run rows")?;

        Ok(runs)
    }
}

fn storage_error(e: anyhow::Error) -> BackendError {
    BackendError::Storage(format!("{e:#}"))
}

#[async_trait]
impl ClubBackend for Store {
    async fn list_teams(&self, organization_id: &str) -> Result<Vec<Team>, BackendError> {
        self.teams(organization_id).map_err(storage_error)
    }

    async fn create_team(&self, team: &NewTeam) -> Result<TeamId, BackendError> {
        self.insert_team(team).map_err(storage_error)
    }

    async fn create_player(&self, player: &NewPlayer) -> Result<PlayerId, BackendError> {
        self.insert_player(player).map_err(storage_error)
    }
}
