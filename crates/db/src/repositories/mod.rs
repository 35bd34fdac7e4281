use async_trait::async_trait;
use thiserror::Error;

use eyematch_core::domain::questionnaire::SessionId;
use eyematch_core::recommend::{RankedRecommendation, RecommendationRun, SourceError};

pub mod memory;
pub mod recommendation;
pub mod source;

pub use memory::{InMemoryRecommendationRepository, InMemoryRecommendationSource};
pub use recommendation::SqlRecommendationRepository;
pub use source::SqlRecommendationSource;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Attach the entity that was being read so the failure surfaces as a bulk-read error.
    pub fn into_source(self, entity: &'static str) -> SourceError {
        SourceError::bulk_read(entity, self.to_string())
    }
}

/// Persisted output of recommendation runs, one ranked list per session.
#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Replace the session's stored list with `run`, returning the number of rows written.
    async fn save_ranked(&self, run: &RecommendationRun) -> Result<usize, RepositoryError>;

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<RankedRecommendation>, RepositoryError>;
}
