//! Article mutation service - create, edit and read articles safely.

use std::sync::Arc;

use uuid::Uuid;

use super::guard::{Claim, IdempotencyConfig, IdempotencyGuard};
use super::mutator::{EditCommand, VersionCheckedMutator};
use crate::domain::{Article, ArticleFields};
use crate::error::DomainError;
use crate::ports::{ArticleRepository, Clock, IdempotencyStore};
use crate::sanitize::sanitize_fields;

/// Result of a create call.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub article: Article,
    /// `true` when an earlier request with the same key produced `article`.
    pub replayed: bool,
}

/// Orchestrates the sanitizer, the idempotency guard and the version-checked
/// mutator over the article store.
pub struct ArticleMutationService {
    repo: Arc<dyn ArticleRepository>,
    clock: Arc<dyn Clock>,
    guard: IdempotencyGuard,
    mutator: VersionCheckedMutator,
}

impl ArticleMutationService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        store: Arc<dyn IdempotencyStore>,
        clock: Arc<dyn Clock>,
        config: IdempotencyConfig,
    ) -> Self {
        Self {
            mutator: VersionCheckedMutator::new(repo.clone(), clock.clone()),
            guard: IdempotencyGuard::new(store, config),
            repo,
            clock,
        }
    }

    pub fn guard(&self) -> &IdempotencyGuard {
        &self.guard
    }

    /// Create a draft article at most once per idempotency key.
    ///
    /// A retry carrying the key of a completed request gets the original
    /// article back instead of a second insert.
    pub async fn create_article(
        &self,
        fields: ArticleFields,
        author_id: Uuid,
        author_name: &str,
        idempotency_key: Option<&str>,
    ) -> Result<CreateOutcome, DomainError> {
        fields.validate()?;
        let clean = sanitize_fields(&fields);
        clean.check_required()?;

        let key = self.guard.scoped_key(author_id, idempotency_key, &clean)?;

        match self.guard.claim(&key).await? {
            Claim::Completed(result_id) => {
                tracing::info!(
                    idempotency_key = %key,
                    article_id = %result_id,
                    "Replaying idempotent create"
                );
                let article = self.repo.find_by_id(result_id).await?.ok_or_else(|| {
                    DomainError::Internal(format!(
                        "Idempotency key {key} points at missing article {result_id}"
                    ))
                })?;
                Ok(CreateOutcome {
                    article,
                    replayed: true,
                })
            }
            Claim::Fresh { token } => {
                let article =
                    Article::new(author_id, author_name.to_string(), clean, self.clock.now());

                let article = match self.repo.insert(article).await {
                    Ok(article) => article,
                    Err(e) => {
                        tracing::error!(idempotency_key = %key, error = %e, "Article insert failed");
                        if let Err(release_err) = self.guard.release(&key, token).await {
                            tracing::warn!(
                                idempotency_key = %key,
                                error = %release_err,
                                "Failed to release idempotency key; it frees itself when the lease ends"
                            );
                        }
                        return Err(e.into());
                    }
                };

                match self.guard.commit(&key, token, article.id).await {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!(
                        idempotency_key = %key,
                        article_id = %article.id,
                        "Article created after its idempotency claim lapsed; result not recorded"
                    ),
                    Err(e) => tracing::error!(
                        idempotency_key = %key,
                        article_id = %article.id,
                        error = %e,
                        "Article created but idempotency commit failed"
                    ),
                }

                tracing::info!(
                    article_id = %article.id,
                    author_id = %author_id,
                    "Article created"
                );
                Ok(CreateOutcome {
                    article,
                    replayed: false,
                })
            }
        }
    }

    /// Edit an article the caller owns, provided nobody changed it since
    /// `expected_version` was read.
    pub async fn edit_article(
        &self,
        article_id: Uuid,
        fields: ArticleFields,
        expected_version: i64,
        editor_id: Uuid,
    ) -> Result<Article, DomainError> {
        fields.validate()?;
        self.mutator
            .apply(EditCommand {
                article_id,
                expected_version,
                fields,
                editor_id,
            })
            .await
    }

    pub async fn get_article(&self, article_id: Uuid) -> Result<Article, DomainError> {
        self.repo
            .find_by_id(article_id)
            .await?
            .ok_or_else(|| DomainError::article_not_found(article_id))
    }
}
