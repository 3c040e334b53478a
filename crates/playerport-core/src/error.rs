// Error types for the import workflow.

use thiserror::Error;

use crate::backend::BackendError;
use crate::model::{MissingTeamBucket, TeamId};
use crate::session::Phase;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no CSV data provided")]
    EmptyInput,

    #[error("no teams found in organization")]
    NoTeams,

    #[error("no valid players found in CSV")]
    NoValidRows,

    #[error("no players with matching teams to import")]
    NoMatchedPlayers,

    #[error("operation requires the {expected} phase, session is {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A create-team call failed part way through a batch. Teams listed in
    /// `created` were committed before the failure and are not rolled back.
    #[error("failed to create team {}: {source}", bucket_label(.bucket))]
    TeamCreation {
        bucket: MissingTeamBucket,
        created: Vec<TeamId>,
        source: BackendError,
    },
}

fn bucket_label(bucket: &MissingTeamBucket) -> String {
    format!(
        "{} {} ({}, {})",
        bucket.age_group, bucket.gender, bucket.sport, bucket.season
    )
}
