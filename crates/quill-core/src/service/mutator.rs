//! Version-checked edits (optimistic concurrency).

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Article, ArticleChanges, ArticleFields};
use crate::error::DomainError;
use crate::ports::{ArticleRepository, Clock};
use crate::sanitize::sanitize_fields;

/// One edit attempt against a specific article version.
#[derive(Debug, Clone)]
pub struct EditCommand {
    pub article_id: Uuid,
    pub expected_version: i64,
    pub fields: ArticleFields,
    pub editor_id: Uuid,
}

/// Applies edits only when the persisted version still matches the one
/// the editor read. The final write is a conditional update, so two edits
/// racing on the same version can never both succeed.
pub struct VersionCheckedMutator {
    repo: Arc<dyn ArticleRepository>,
    clock: Arc<dyn Clock>,
}

impl VersionCheckedMutator {
    pub fn new(repo: Arc<dyn ArticleRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn apply(&self, cmd: EditCommand) -> Result<Article, DomainError> {
        let article = self
            .repo
            .find_by_id(cmd.article_id)
            .await?
            .ok_or_else(|| DomainError::article_not_found(cmd.article_id))?;

        if !article.is_owned_by(cmd.editor_id) {
            tracing::warn!(
                article_id = %cmd.article_id,
                editor_id = %cmd.editor_id,
                "Edit rejected: editor is not the author"
            );
            return Err(DomainError::Forbidden(
                "Only the author may edit this article".to_string(),
            ));
        }

        if article.version != cmd.expected_version {
            tracing::info!(
                article_id = %cmd.article_id,
                expected_version = cmd.expected_version,
                current_version = article.version,
                "Edit rejected: stale version"
            );
            return Err(DomainError::stale_version(article.version));
        }

        let clean = sanitize_fields(&cmd.fields);
        clean.check_required()?;

        let changes = ArticleChanges {
            title: clean.title,
            content: clean.content,
            summary: clean.summary,
            tags: clean.tags,
            updated_at: article.next_updated_at(self.clock.now()),
        };

        let written = self
            .repo
            .conditional_update(cmd.article_id, cmd.expected_version, &changes)
            .await?;

        if written {
            tracing::info!(
                article_id = %cmd.article_id,
                version = cmd.expected_version + 1,
                "Article updated"
            );
            return Ok(article.with_changes(changes, cmd.expected_version));
        }

        // Lost the race between the read above and the write.
        match self.repo.find_by_id(cmd.article_id).await? {
            Some(current) => {
                tracing::info!(
                    article_id = %cmd.article_id,
                    expected_version = cmd.expected_version,
                    current_version = current.version,
                    "Edit lost a concurrent write"
                );
                Err(DomainError::stale_version(current.version))
            }
            None => Err(DomainError::article_not_found(cmd.article_id)),
        }
    }
}
