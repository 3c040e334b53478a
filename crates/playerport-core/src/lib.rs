// Player import pipeline: CSV parsing, team matching, missing-team
// aggregation, and committing rows to an organization backend.

pub mod backend;
pub mod coordinator;
pub mod csv_import;
pub mod error;
pub mod matcher;
pub mod model;
pub mod queue;
pub mod session;
pub mod store;
pub mod template;

pub use backend::{BackendError, ClubBackend, MemoryBackend};
pub use error::ImportError;
pub use session::{ImportSession, Phase, SessionConfig};
pub use store::Store;
