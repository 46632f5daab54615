use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Article, ArticleChanges};
use crate::error::RepoError;

/// Generic repository trait - the read/insert half of the store contract.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity and return it as persisted.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;
}

/// Article store contract.
#[async_trait]
pub trait ArticleRepository: BaseRepository<Article, Uuid> {
    /// Write `changes` and set `version = expected_version + 1` in a single
    /// statement predicated on `id = id AND version = expected_version`.
    ///
    /// Returns `true` iff exactly one row was updated. Two callers racing on
    /// the same `expected_version` can never both observe `true`.
    async fn conditional_update(
        &self,
        id: Uuid,
        expected_version: i64,
        changes: &ArticleChanges,
    ) -> Result<bool, RepoError>;
}
