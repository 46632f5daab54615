//! In-memory article repository - used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Article, ArticleChanges};
use quill_core::error::RepoError;
use quill_core::ports::{ArticleRepository, BaseRepository};

/// Articles in a HashMap behind an async RwLock.
///
/// A conditional update holds the write lock for both the version check and
/// the write. Note: data is lost on process restart.
#[derive(Default)]
pub struct InMemoryArticleRepository {
    articles: RwLock<HashMap<Uuid, Article>>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.articles.read().await.is_empty()
    }
}

#[async_trait]
impl BaseRepository<Article, Uuid> for InMemoryArticleRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, RepoError> {
        Ok(self.articles.read().await.get(&id).cloned())
    }

    async fn insert(&self, entity: Article) -> Result<Article, RepoError> {
        let mut articles = self.articles.write().await;
        if articles.contains_key(&entity.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        articles.insert(entity.id, entity.clone());
        Ok(entity)
    }
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn conditional_update(
        &self,
        id: Uuid,
        expected_version: i64,
        changes: &ArticleChanges,
    ) -> Result<bool, RepoError> {
        let mut articles = self.articles.write().await;
        let Some(article) = articles.get_mut(&id) else {
            return Ok(false);
        };
        if article.version != expected_version {
            return Ok(false);
        }

        article.title = changes.title.clone();
        article.content = changes.content.clone();
        article.summary = changes.summary.clone();
        article.tags = changes.tags.clone();
        article.updated_at = changes.updated_at;
        article.version = expected_version + 1;
        Ok(true)
    }
}
