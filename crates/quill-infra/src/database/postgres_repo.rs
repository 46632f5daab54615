//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use quill_core::domain::ArticleChanges;
use quill_core::error::RepoError;
use quill_core::ports::ArticleRepository;

use super::entity::article::{self, Entity as ArticleEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL article repository.
pub type PostgresArticleRepository = PostgresBaseRepository<ArticleEntity>;

#[async_trait]
impl ArticleRepository for PostgresArticleRepository {
    async fn conditional_update(
        &self,
        id: Uuid,
        expected_version: i64,
        changes: &ArticleChanges,
    ) -> Result<bool, RepoError> {
        tracing::debug!(article_id = %id, expected_version, "Conditional article update");

        let result = ArticleEntity::update_many()
            .col_expr(article::Column::Title, Expr::value(changes.title.clone()))
            .col_expr(article::Column::Content, Expr::value(changes.content.clone()))
            .col_expr(article::Column::Summary, Expr::value(changes.summary.clone()))
            .col_expr(article::Column::Tags, Expr::value(changes.tags.clone()))
            .col_expr(
                article::Column::UpdatedAt,
                Expr::value(changes.updated_at.fixed_offset()),
            )
            .col_expr(article::Column::Version, Expr::value(expected_version + 1))
            .filter(article::Column::Id.eq(id))
            .filter(article::Column::Version.eq(expected_version))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected == 1)
    }
}
