// Import session: the workflow state for one import, from pasted text to a
// committed run.
//
// Idle -> Parsed -> Reviewing -> Importing -> Idle (some rows committed)
//                                          -> Reviewing (nothing committed)
//
// Re-matching is explicit: every operation that can change the team list
// calls `refresh_teams` afterwards.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::ClubBackend;
use crate::coordinator::{self, CommitOptions, ImportRun};
use crate::csv_import::{parse_players, ParseOptions};
use crate::error::ImportError;
use crate::matcher::{match_rows, match_stats, missing_teams, MatchStats};
use crate::model::{MissingTeamBucket, ParsedPlayerRow, Team, TeamId};
use crate::template::SAMPLE_CSV;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Parsed,
    Reviewing,
    Importing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Parsed => "parsed",
            Phase::Reviewing => "reviewing",
            Phase::Importing => "importing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub organization_id: String,
    pub parse: ParseOptions,
    /// Clear the session after a run with at least one success even if other
    /// rows failed. When false, a run with failures keeps the rows that were
    /// not committed for another attempt.
    pub clear_on_partial_success: bool,
}

impl SessionConfig {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            parse: ParseOptions::default(),
            clear_on_partial_success: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseReport {
    pub parsed: usize,
    pub skipped: usize,
    pub stats: MatchStats,
}

pub struct ImportSession {
    backend: Arc<dyn ClubBackend>,
    config: SessionConfig,
    phase: Phase,
    raw_text: String,
    rows: Vec<ParsedPlayerRow>,
    teams: Vec<Team>,
}

impl ImportSession {
    pub fn new(backend: Arc<dyn ClubBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            phase: Phase::Idle,
            raw_text: String::new(),
            rows: Vec::new(),
            teams: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rows(&self) -> &[ParsedPlayerRow] {
        &self.rows
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn stats(&self) -> MatchStats {
        match_stats(&self.rows)
    }

    pub fn missing_teams(&self) -> Vec<MissingTeamBucket> {
        missing_teams(&self.rows)
    }

    /// Replace the raw import text. Parsed rows are kept until the next
    /// `parse`.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ImportError> {
        self.ensure_not_importing()?;
        self.raw_text = text.into();
        Ok(())
    }

    pub fn load_sample(&mut self) -> Result<(), ImportError> {
        self.set_text(SAMPLE_CSV)
    }

    /// Fetch the organization's teams and re-match any parsed rows.
    pub async fn refresh_teams(&mut self) -> Result<MatchStats, ImportError> {
        self.teams = self
            .backend
            .list_teams(&self.config.organization_id)
            .await?;
        let stats = match_rows(&mut self.rows, &self.teams);
        debug!(teams = self.teams.len(), matched = stats.matched, unmatched = stats.unmatched, "re-matched rows");
        Ok(stats)
    }

    /// Parse the raw text and match the rows against the current team list.
    pub async fn parse(&mut self) -> Result<ParseReport, ImportError> {
        self.ensure_not_importing()?;
        if self.raw_text.trim().is_empty() {
            return Err(ImportError::EmptyInput);
        }

        self.teams = self
            .backend
            .list_teams(&self.config.organization_id)
            .await?;
        if self.teams.is_empty() {
            return Err(ImportError::NoTeams);
        }

        let outcome = parse_players(&self.raw_text, &self.config.parse)?;
        if outcome.rows.is_empty() {
            return Err(ImportError::NoValidRows);
        }

        self.rows = outcome.rows;
        let stats = match_rows(&mut self.rows, &self.teams);
        self.phase = Phase::Parsed;
        info!(parsed = self.rows.len(), skipped = outcome.skipped, matched = stats.matched, "parsed import file");

        Ok(ParseReport {
            parsed: self.rows.len(),
            skipped: outcome.skipped,
            stats,
        })
    }

    /// Move to review of the missing teams.
    pub fn begin_review(&mut self) -> Result<(), ImportError> {
        self.ensure_has_rows()?;
        self.phase = Phase::Reviewing;
        Ok(())
    }

    /// Create teams for the selected buckets, then re-match.
    ///
    /// On a partial failure the teams created before it remain, rows are
    /// re-matched against them, and the creation error is returned.
    pub async fn create_missing_teams(
        &mut self,
        selected: &[MissingTeamBucket],
    ) -> Result<Vec<TeamId>, ImportError> {
        self.ensure_has_rows()?;
        self.phase = Phase::Reviewing;

        let result = coordinator::create_missing_teams(
            self.backend.as_ref(),
            &self.config.organization_id,
            selected,
        )
        .await;

        match result {
            Ok(created) => {
                self.refresh_teams().await?;
                Ok(created)
            }
            Err(err @ ImportError::TeamCreation { .. }) => {
                // The creation error carries the created ids; keep it.
                if let Err(refresh) = self.refresh_teams().await {
                    warn!(error = %refresh, "failed to refresh teams after team creation error");
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Commit every matched row.
    ///
    /// With at least one success the session is cleared and returns to Idle,
    /// unless `clear_on_partial_success` is off and some rows were not
    /// committed, in which case only those rows are kept for review. With no
    /// successes everything is kept and the session returns to Reviewing.
    pub async fn import_matched(&mut self, options: &CommitOptions) -> Result<ImportRun, ImportError> {
        self.ensure_has_rows()?;

        let run = {
            // Restores the previous phase on return, or if this future is
            // dropped mid-run.
            let _importing = PhaseGuard::enter(&mut self.phase, Phase::Importing);
            coordinator::import_players(
                self.backend.as_ref(),
                &self.config.organization_id,
                &self.rows,
                options,
            )
            .await?
        };

        let summary = &run.summary;
        let complete = summary.failed == 0 && summary.skipped == 0;
        if summary.succeeded == 0 {
            self.phase = Phase::Reviewing;
        } else if complete || self.config.clear_on_partial_success {
            self.clear();
        } else {
            self.rows.retain(|r| !run.imported_rows.contains(&r.row_index));
            self.phase = Phase::Reviewing;
        }

        Ok(run)
    }

    /// Drop all rows and text and return to Idle.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.raw_text.clear();
        self.phase = Phase::Idle;
    }

    fn ensure_not_importing(&self) -> Result<(), ImportError> {
        if self.phase == Phase::Importing {
            return Err(ImportError::WrongPhase {
                expected: Phase::Reviewing,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn ensure_has_rows(&self) -> Result<(), ImportError> {
        match self.phase {
            Phase::Parsed | Phase::Reviewing => Ok(()),
            actual => Err(ImportError::WrongPhase {
                expected: Phase::Parsed,
                actual,
            }),
        }
    }
}

/// Holds a session in `phase` until dropped, then puts back the phase it
/// replaced.
struct PhaseGuard<'a> {
    slot: &'a mut Phase,
    previous: Phase,
}

impl<'a> PhaseGuard<'a> {
    fn enter(slot: &'a mut Phase, phase: Phase) -> Self {
        let previous = std::mem::replace(slot, phase);
        Self { slot, previous }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.slot = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const ORG: &str = "org_1";

    fn team(id: &str, age: &str, gender: &str) -> Team {
        Team {
            id: id.into(),
            name: format!("{age} {gender}"),
            sport: Some("GAA Football".into()),
            age_group: Some(age.into()),
            gender: Some(gender.into()),
            season: Some("2025".into()),
            is_active: Some(true),
        }
    }

    const CSV: &str = "Name,AgeGroup,Sport,Gender,Season\n\
        John Smith,U12,GAA Football,Male,2025\n\
        Emma Johnson,U10,GAA Football,Female,2025\n\
        Liam Murphy,U12,GAA Football,M,2025";

    async fn session_with(backend: Arc<MemoryBackend>, text: &str) -> ImportSession {
        let mut session = ImportSession::new(backend, SessionConfig::new(ORG));
        session.set_text(text).unwrap();
        session
    }

    #[tokio::test]
    async fn validation_errors_in_order() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(backend.clone(), "   ").await;
        assert!(matches!(session.parse().await, Err(ImportError::EmptyInput)));

        session.set_text(CSV).unwrap();
        assert!(matches!(session.parse().await, Err(ImportError::NoTeams)));

        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        session.set_text("Name,AgeGroup,Sport,Gender\n,U12,GAA Football,Male").unwrap();
        assert!(matches!(session.parse().await, Err(ImportError::NoValidRows)));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn parse_matches_and_reports() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        let mut session = session_with(backend, CSV).await;

        let report = session.parse().await.unwrap();
        assert_eq!(report.parsed, 3);
        assert_eq!(report.stats, MatchStats { matched: 2, unmatched: 1 });
        assert_eq!(session.phase(), Phase::Parsed);
        assert_eq!(session.missing_teams().len(), 1);
    }

    #[tokio::test]
    async fn creating_missing_teams_rematches() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        let mut session = session_with(backend, CSV).await;
        session.parse().await.unwrap();
        session.begin_review().unwrap();

        let missing = session.missing_teams();
        let created = session.create_missing_teams(&missing).await.unwrap();
        assert_eq!(created.len(), 1);
        assert!(session.missing_teams().is_empty());
        assert_eq!(session.stats().matched, 3);
        assert_eq!(session.rows()[1].matched_team_name.as_deref(), Some("U10 Girls"));
        assert_eq!(session.phase(), Phase::Reviewing);
    }

    #[tokio::test]
    async fn partial_success_clears_session() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        backend.add_team(ORG, team("t2", "U10", "Girls")).await;
        backend.fail_player_call(2).await;
        let mut session = session_with(backend, CSV).await;
        session.parse().await.unwrap();

        let run = session.import_matched(&CommitOptions::default()).await.unwrap();
        assert_eq!(run.summary.succeeded, 2);
        assert_eq!(run.summary.failed, 1);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.rows().is_empty());
        assert!(session.raw_text().is_empty());
    }

    #[tokio::test]
    async fn partial_success_keeps_failed_rows_when_configured() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        backend.add_team(ORG, team("t2", "U10", "Girls")).await;
        backend.fail_player_call(2).await;
        let mut config = SessionConfig::new(ORG);
        config.clear_on_partial_success = false;
        let mut session = ImportSession::new(backend, config);
        session.set_text(CSV).unwrap();
        session.parse().await.unwrap();

        session.import_matched(&CommitOptions::default()).await.unwrap();
        assert_eq!(session.phase(), Phase::Reviewing);
        assert_eq!(session.rows().len(), 1);
        assert_eq!(session.rows()[0].name, "Emma Johnson");
        assert_eq!(session.raw_text(), CSV);
    }

    #[tokio::test]
    async fn total_failure_returns_to_review() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        backend.fail_player_call(1).await;
        backend.fail_player_call(2).await;
        let mut session = session_with(backend, CSV).await;
        session.parse().await.unwrap();

        let run = session.import_matched(&CommitOptions::default()).await.unwrap();
        assert_eq!(run.summary.succeeded, 0);
        assert_eq!(session.phase(), Phase::Reviewing);
        assert_eq!(session.rows().len(), 3);
    }

    #[tokio::test]
    async fn import_before_parse_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(backend, CSV).await;
        let err = session
            .import_matched(&CommitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::WrongPhase { expected: Phase::Parsed, actual: Phase::Idle }
        ));
    }

    #[tokio::test]
    async fn nothing_matched_keeps_phase() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t9", "U18", "Mixed")).await;
        let mut session = session_with(backend, CSV).await;
        session.parse().await.unwrap();
        let err = session
            .import_matched(&CommitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::NoMatchedPlayers));
        assert_eq!(session.phase(), Phase::Parsed);
    }

    #[tokio::test]
    async fn load_sample_sets_text() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = ImportSession::new(backend, SessionConfig::new(ORG));
        session.load_sample().unwrap();
        assert_eq!(session.raw_text(), SAMPLE_CSV);
    }

    fn delayed_backend(delay: Duration) -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new().with_delay(delay))
    }

    const FOUR_ROWS: &str = "Name,AgeGroup,Sport,Gender,Season\n\
        John Smith,U12,GAA Football,Male,2025\n\
        Emma Johnson,U10,GAA Football,Female,2025\n\
        Liam Murphy,U12,GAA Football,M,2025\n\
        Ciara Walsh,U10,GAA Football,F,2025";

    /// Run an import that is cancelled from the progress channel as soon as
    /// one row has been committed.
    async fn import_cancelled_after_first_success(
        session: &mut ImportSession,
    ) -> ImportRun {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let options = CommitOptions {
            progress: Some(tx),
            ..CommitOptions::default()
        };
        let cancel = options.cancel.clone();
        tokio::spawn(async move {
            while let Some(p) = rx.recv().await {
                if p.succeeded >= 1 {
                    cancel.cancel();
                }
            }
        });
        session.import_matched(&options).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_with_success_clears_by_default() {
        let backend = delayed_backend(Duration::from_millis(20));
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        backend.add_team(ORG, team("t2", "U10", "Girls")).await;
        let mut session = session_with(backend.clone(), FOUR_ROWS).await;
        session.parse().await.unwrap();

        let run = import_cancelled_after_first_success(&mut session).await;
        assert!(run.summary.cancelled);
        assert!(run.summary.succeeded >= 1);
        assert!(run.summary.skipped >= 1);
        assert_eq!(run.summary.succeeded + run.summary.skipped, 4);
        assert_eq!(backend.players().await.len(), run.summary.succeeded);

        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_keeps_skipped_rows_when_configured() {
        let backend = delayed_backend(Duration::from_millis(20));
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        backend.add_team(ORG, team("t2", "U10", "Girls")).await;
        let mut config = SessionConfig::new(ORG);
        config.clear_on_partial_success = false;
        let mut session = ImportSession::new(backend, config);
        session.set_text(FOUR_ROWS).unwrap();
        session.parse().await.unwrap();

        let run = import_cancelled_after_first_success(&mut session).await;
        assert!(run.summary.succeeded >= 1);
        assert_eq!(session.phase(), Phase::Reviewing);
        assert_eq!(session.rows().len(), run.summary.skipped);
        assert!(session
            .rows()
            .iter()
            .all(|r| !run.imported_rows.contains(&r.row_index)));
        // The kept rows are the tail that never started.
        assert_eq!(session.rows().last().map(|r| r.name.as_str()), Some("Ciara Walsh"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_import_restores_phase() {
        let backend = delayed_backend(Duration::from_millis(100));
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        let mut session = session_with(backend.clone(), CSV).await;
        session.parse().await.unwrap();

        let options = CommitOptions::default();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), session.import_matched(&options)).await;
        assert!(timed_out.is_err());

        assert_eq!(session.phase(), Phase::Parsed);
        session.set_text(CSV).unwrap();
        session.parse().await.unwrap();
        assert!(backend.players().await.is_empty());
    }

    #[tokio::test]
    async fn team_creation_error_survives_failed_refresh() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_team(ORG, team("t1", "U12", "Boys")).await;
        backend.fail_team_call(2).await;
        let text = format!("{CSV}\nAoife Byrne,U8,GAA Football,Mixed,2025");
        let mut session = session_with(backend.clone(), &text).await;
        session.parse().await.unwrap();
        session.begin_review().unwrap();

        let missing = session.missing_teams();
        assert_eq!(missing.len(), 2);
        backend.fail_list_teams(true);

        match session.create_missing_teams(&missing).await.unwrap_err() {
            ImportError::TeamCreation { bucket, created, .. } => {
                assert_eq!(bucket.age_group, "U8");
                assert_eq!(created.len(), 1);
            }
            other => panic!("expected TeamCreation, got: {other}"),
        }
        assert_eq!(session.phase(), Phase::Reviewing);
    }
}
