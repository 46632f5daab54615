#[cfg(test)]
mod tests {
    use crate::database::entity::article;
    use crate::database::postgres_repo::PostgresArticleRepository;
    use chrono::Utc;
    use quill_core::domain::{Article, ArticleChanges, ArticleFields, ArticleStatus};
    use quill_core::error::RepoError;
    use quill_core::ports::{ArticleRepository, BaseRepository};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr};
    use uuid::Uuid;

    fn model(id: Uuid, version: i64) -> article::Model {
        let now = Utc::now();
        article::Model {
            id,
            title: "Test Article".to_owned(),
            content: "<p>Content</p>".to_owned(),
            summary: None,
            tags: Some("rust".to_owned()),
            status: article::Status::Draft,
            author_id: Uuid::new_v4(),
            author_name: "alice".to_owned(),
            version,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn changes() -> ArticleChanges {
        ArticleChanges {
            title: "New".to_owned(),
            content: "Body".to_owned(),
            summary: Some("Short".to_owned()),
            tags: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_article_by_id() {
        let article_id = Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model(article_id, 3)]])
            .into_connection();

        let repo = PostgresArticleRepository::new(db);
        let result: Option<Article> = repo.find_by_id(article_id).await.unwrap();

        let article = result.unwrap();
        assert_eq!(article.id, article_id);
        assert_eq!(article.title, "Test Article");
        assert_eq!(article.version, 3);
        assert_eq!(article.status, ArticleStatus::Draft);
    }

    #[tokio::test]
    async fn test_insert_returns_persisted_article() {
        let draft = Article::new(
            Uuid::new_v4(),
            "alice".to_owned(),
            ArticleFields::new("Test Article", "<p>Content</p>"),
            Utc::now(),
        );
        let mut row = model(draft.id, 1);
        row.author_id = draft.author_id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![row]])
            .into_connection();

        let repo = PostgresArticleRepository::new(db);
        let saved = repo.insert(draft.clone()).await.unwrap();

        assert_eq!(saved.id, draft.id);
        assert_eq!(saved.author_id, draft.author_id);
        assert_eq!(saved.version, 1);
    }

    #[tokio::test]
    async fn test_conditional_update_reports_row_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let repo = PostgresArticleRepository::new(db);
        let id = Uuid::new_v4();

        assert!(repo.conditional_update(id, 1, &changes()).await.unwrap());
        assert!(!repo.conditional_update(id, 1, &changes()).await.unwrap());
    }

    #[tokio::test]
    async fn test_connection_errors_map_to_connection() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors(vec![DbErr::Conn(RuntimeErr::Internal(
                "connection refused".to_owned(),
            ))])
            .into_connection();

        let repo = PostgresArticleRepository::new(db);
        let result = repo.conditional_update(Uuid::new_v4(), 1, &changes()).await;

        assert!(matches!(result, Err(RepoError::Connection(_))));
    }
}
