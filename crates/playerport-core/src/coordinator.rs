// Commit coordinator: creates missing teams and submits matched players to
// the backend.
//
// Team creation is fail-fast: the first failed call aborts the batch and the
// teams created before it stay created. Player import is fail-soft: each
// row's failure is counted and the run moves on. Nothing is retried.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::{BackendError, ClubBackend};
use crate::error::ImportError;
use crate::model::{MissingTeamBucket, NewPlayer, NewTeam, ParsedPlayerRow, TeamId};
use crate::queue::{run_queue, Outcome};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Live counters published after every completed create-player call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportProgress {
    /// Calls completed so far, successful or not.
    pub current: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub row_index: usize,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ImportSummary {
    /// Matched rows selected for import.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows never attempted because the run was cancelled.
    pub skipped: usize,
    pub cancelled: bool,
    pub failures: Vec<RowFailure>,
}

#[derive(Debug, Clone)]
pub struct CommitOptions {
    /// Maximum create-player calls in flight. 1 keeps the run sequential in
    /// row order.
    pub concurrency: usize,
    pub cancel: CancellationToken,
    pub progress: Option<mpsc::UnboundedSender<ImportProgress>>,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

/// Outcome of a player import: the summary plus the row indices that were
/// committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRun {
    pub summary: ImportSummary,
    pub imported_rows: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Team creation
// ---------------------------------------------------------------------------

/// Create one team per selected bucket, in order. Returns the new team ids.
pub async fn create_missing_teams(
    backend: &dyn ClubBackend,
    organization_id: &str,
    buckets: &[MissingTeamBucket],
) -> Result<Vec<TeamId>, ImportError> {
    let mut created = Vec::with_capacity(buckets.len());

    for bucket in buckets {
        let team = NewTeam::from_bucket(organization_id, bucket);
        match backend.create_team(&team).await {
            Ok(id) => {
                info!(team = %team.name, sport = %team.sport, season = %team.season, %id, "created team");
                created.push(id);
            }
            Err(source) => {
                warn!(team = %team.name, error = %source, created = created.len(), "team creation failed, aborting batch");
                return Err(ImportError::TeamCreation {
                    bucket: bucket.clone(),
                    created,
                    source,
                });
            }
        }
    }

    Ok(created)
}

// ---------------------------------------------------------------------------
// Player import
// ---------------------------------------------------------------------------

/// Submit every matched row as a create-player call.
///
/// Unmatched rows are ignored. Fails only when there is nothing to import;
/// per-row failures are reported in the summary.
pub async fn import_players(
    backend: &dyn ClubBackend,
    organization_id: &str,
    rows: &[ParsedPlayerRow],
    options: &CommitOptions,
) -> Result<ImportRun, ImportError> {
    let to_import: Vec<&ParsedPlayerRow> = rows.iter().filter(|r| r.is_matched()).collect();
    if to_import.is_empty() {
        return Err(ImportError::NoMatchedPlayers);
    }

    let mut progress = ImportProgress {
        total: to_import.len(),
        ..ImportProgress::default()
    };
    publish(options, progress);
    info!(total = progress.total, concurrency = options.concurrency, "importing matched players");

    let results = run_queue(
        to_import.clone(),
        options.concurrency,
        &options.cancel,
        |row: &ParsedPlayerRow| {
            let player = NewPlayer::from_row(organization_id, row);
            async move { backend.create_player(&player).await }
        },
        |idx, outcome: &Outcome<String, BackendError>| {
            match outcome {
                Outcome::Done(_) => progress.succeeded += 1,
                Outcome::Failed(err) => {
                    progress.failed += 1;
                    warn!(row = to_import[idx].row_index, player = %to_import[idx].name, error = %err, "failed to import player");
                }
                Outcome::Skipped => return,
            }
            progress.current += 1;
            publish(options, progress);
        },
    )
    .await;

    let mut summary = ImportSummary {
        total: to_import.len(),
        ..ImportSummary::default()
    };
    let mut imported_rows = Vec::new();
    for (idx, outcome) in results {
        let row = to_import[idx];
        match outcome {
            Outcome::Done(_) => {
                summary.succeeded += 1;
                imported_rows.push(row.row_index);
            }
            Outcome::Failed(err) => {
                summary.failed += 1;
                summary.failures.push(RowFailure {
                    row_index: row.row_index,
                    name: row.name.clone(),
                    message: err.to_string(),
                });
            }
            Outcome::Skipped => summary.skipped += 1,
        }
    }
    summary.cancelled = summary.skipped > 0;

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "player import finished"
    );

    Ok(ImportRun {
        summary,
        imported_rows,
    })
}

fn publish(options: &CommitOptions, progress: ImportProgress) {
    if let Some(tx) = &options.progress {
        // Receiver gone means nobody is watching; the run carries on.
        let _ = tx.send(progress);
    }
}
