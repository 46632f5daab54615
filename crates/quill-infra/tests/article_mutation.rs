//! End-to-end behavior of the mutation service over the in-memory adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use uuid::Uuid;

use quill_core::DomainError;
use quill_core::domain::{Article, ArticleChanges, ArticleFields, Reservation};
use quill_core::error::{IdempotencyError, RepoError};
use quill_core::ports::{
    ArticleRepository, BaseRepository, Clock, IdempotencyStore, ManualClock, SystemClock,
};
use quill_core::service::{ArticleMutationService, IdempotencyConfig, KeyPolicy};
use quill_infra::{InMemoryArticleRepository, InMemoryIdempotencyStore};

/// In-memory repository that counts writes and can fail the next insert.
#[derive(Default)]
struct CountingRepo {
    inner: InMemoryArticleRepository,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    fail_next_insert: AtomicBool,
}

impl CountingRepo {
    fn writes(&self) -> usize {
        self.inserts.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseRepository<Article, Uuid> for CountingRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, entity: Article) -> Result<Article, RepoError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Connection("connection reset".to_string()));
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(entity).await
    }
}

#[async_trait]
impl ArticleRepository for CountingRepo {
    async fn conditional_update(
        &self,
        id: Uuid,
        expected_version: i64,
        changes: &ArticleChanges,
    ) -> Result<bool, RepoError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner
            .conditional_update(id, expected_version, changes)
            .await
    }
}

/// In-memory idempotency store with switchable outages.
struct FlakyStore {
    inner: InMemoryIdempotencyStore,
    reserve_down: AtomicBool,
    commit_down: AtomicBool,
}

impl FlakyStore {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryIdempotencyStore::with_clock(clock),
            reserve_down: AtomicBool::new(false),
            commit_down: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IdempotencyStore for FlakyStore {
    async fn reserve(&self, key: &str, lease: Duration) -> Result<Reservation, IdempotencyError> {
        if self.reserve_down.load(Ordering::SeqCst) {
            return Err(IdempotencyError::Unavailable("store offline".to_string()));
        }
        self.inner.reserve(key, lease).await
    }

    async fn commit(
        &self,
        key: &str,
        token: Uuid,
        result_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError> {
        if self.commit_down.load(Ordering::SeqCst) {
            return Err(IdempotencyError::Unavailable("store offline".to_string()));
        }
        self.inner.commit(key, token, result_id, ttl).await
    }

    async fn lookup(&self, key: &str) -> Result<Option<Uuid>, IdempotencyError> {
        self.inner.lookup(key).await
    }

    async fn release(&self, key: &str, token: Uuid) -> Result<bool, IdempotencyError> {
        self.inner.release(key, token).await
    }

    async fn purge_expired(&self) -> Result<usize, IdempotencyError> {
        self.inner.purge_expired().await
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

struct Harness {
    service: Arc<ArticleMutationService>,
    repo: Arc<CountingRepo>,
    store: Arc<FlakyStore>,
}

fn harness_with(clock: Arc<dyn Clock>, config: IdempotencyConfig) -> Harness {
    let repo = Arc::new(CountingRepo::default());
    let store = Arc::new(FlakyStore::new(clock.clone()));
    let service = Arc::new(ArticleMutationService::new(
        repo.clone(),
        store.clone(),
        clock,
        config,
    ));
    Harness {
        service,
        repo,
        store,
    }
}

fn harness_with_clock(clock: Arc<dyn Clock>) -> Harness {
    harness_with(clock, IdempotencyConfig::default())
}

fn harness() -> Harness {
    harness_with_clock(Arc::new(SystemClock))
}

fn fields() -> ArticleFields {
    ArticleFields::new("Hello", "<p>First draft</p>").with_tags("rust,web")
}

async fn seed(h: &Harness, author: Uuid) -> Article {
    h.service
        .create_article(fields(), author, "alice", None)
        .await
        .unwrap()
        .article
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_creates_insert_once() {
    let h = harness();
    let author = Uuid::new_v4();

    let calls = (0..8).map(|_| {
        let service = h.service.clone();
        tokio::spawn(async move {
            service
                .create_article(fields(), author, "alice", Some("retry-123"))
                .await
        })
    });
    let outcomes: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let first_id = outcomes[0].article.id;
    assert!(outcomes.iter().all(|o| o.article.id == first_id));
    assert_eq!(outcomes.iter().filter(|o| !o.replayed).count(), 1);
    assert_eq!(h.repo.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sequential_retry_replays_original() {
    let h = harness();
    let author = Uuid::new_v4();

    let first = h
        .service
        .create_article(fields(), author, "alice", Some("k-1"))
        .await
        .unwrap();
    let retry = h
        .service
        .create_article(fields(), author, "alice", Some("k-1"))
        .await
        .unwrap();

    assert!(!first.replayed);
    assert!(retry.replayed);
    assert_eq!(retry.article, first.article);
    assert_eq!(h.repo.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_new_key_always_inserts() {
    let h = harness();
    let author = Uuid::new_v4();

    let a = h
        .service
        .create_article(fields(), author, "alice", None)
        .await
        .unwrap();
    let b = h
        .service
        .create_article(fields(), author, "alice", None)
        .await
        .unwrap();

    assert_ne!(a.article.id, b.article.id);
    assert_eq!(h.repo.inserts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_same_key_from_different_authors_does_not_collide() {
    let h = harness();

    let a = h
        .service
        .create_article(fields(), Uuid::new_v4(), "alice", Some("shared"))
        .await
        .unwrap();
    let b = h
        .service
        .create_article(fields(), Uuid::new_v4(), "bob", Some("shared"))
        .await
        .unwrap();

    assert_ne!(a.article.id, b.article.id);
    assert!(!b.replayed);
}

#[tokio::test]
async fn test_fingerprint_ignores_markup_removed_by_sanitizer() {
    let h = harness_with(
        Arc::new(SystemClock),
        IdempotencyConfig {
            policy: KeyPolicy::ContentFingerprint,
            ..IdempotencyConfig::default()
        },
    );
    let author = Uuid::new_v4();

    let first = h
        .service
        .create_article(
            ArticleFields::new("Hello", "<p>World</p>"),
            author,
            "alice",
            None,
        )
        .await
        .unwrap();
    let noisy = h
        .service
        .create_article(
            ArticleFields::new("<b>Hello</b>", "<p onclick=\"x()\">World</p>"),
            author,
            "alice",
            None,
        )
        .await
        .unwrap();

    assert!(noisy.replayed);
    assert_eq!(noisy.article.id, first.article.id);
    assert_eq!(h.repo.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_created_article_is_sanitized_draft() {
    let h = harness();
    let author = Uuid::new_v4();

    let created = h
        .service
        .create_article(
            ArticleFields::new("<script>alert(1)</script>Hi", "ok"),
            author,
            "alice",
            None,
        )
        .await
        .unwrap()
        .article;

    assert!(!created.title.contains("<script"));
    assert!(!created.title.contains("alert"));
    assert!(created.title.contains("Hi"));
    assert_eq!(created.version, 1);
    assert_eq!(created.author_id, author);
    assert_eq!(created.author_name, "alice");
    assert_eq!(created.status.as_str(), "draft");
}

#[tokio::test]
async fn test_invalid_create_never_touches_store() {
    let h = harness();

    let result = h
        .service
        .create_article(ArticleFields::new("", "body"), Uuid::new_v4(), "alice", None)
        .await;

    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert_eq!(h.repo.writes(), 0);
    assert!(h.store.inner.is_empty().await);
}

#[tokio::test]
async fn test_reserve_outage_fails_closed() {
    let h = harness();
    h.store.reserve_down.store(true, Ordering::SeqCst);

    let result = h
        .service
        .create_article(fields(), Uuid::new_v4(), "alice", Some("k"))
        .await;

    assert!(matches!(result, Err(DomainError::StoreUnavailable(_))));
    assert_eq!(h.repo.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_insert_releases_key_for_retry() {
    let h = harness();
    let author = Uuid::new_v4();
    h.repo.fail_next_insert.store(true, Ordering::SeqCst);

    let failed = h
        .service
        .create_article(fields(), author, "alice", Some("k"))
        .await;
    assert!(matches!(failed, Err(DomainError::StoreUnavailable(_))));

    let retry = h
        .service
        .create_article(fields(), author, "alice", Some("k"))
        .await
        .unwrap();
    assert!(!retry.replayed);
    assert_eq!(h.repo.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_commit_outage_still_returns_article() {
    let h = harness();
    h.store.commit_down.store(true, Ordering::SeqCst);

    let outcome = h
        .service
        .create_article(fields(), Uuid::new_v4(), "alice", Some("k"))
        .await
        .unwrap();

    let stored = h.service.get_article(outcome.article.id).await.unwrap();
    assert_eq!(stored, outcome.article);
}

#[tokio::test]
async fn test_key_expires_after_ttl() {
    let clock = Arc::new(ManualClock::default());
    let h = harness_with_clock(clock.clone());
    let author = Uuid::new_v4();

    let first = h
        .service
        .create_article(fields(), author, "alice", Some("k"))
        .await
        .unwrap();
    clock.advance(chrono::Duration::hours(24));
    let later = h
        .service
        .create_article(fields(), author, "alice", Some("k"))
        .await
        .unwrap();

    assert_ne!(first.article.id, later.article.id);
    assert!(!later.replayed);
    assert_eq!(h.service.guard().purge_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_with_current_version_then_stale_retry() {
    let h = harness();
    let author = Uuid::new_v4();
    let article = seed(&h, author).await;

    let edited = h
        .service
        .edit_article(article.id, ArticleFields::new("Second", "<em>v2</em>"), 1, author)
        .await
        .unwrap();
    assert_eq!(edited.version, 2);
    assert!(edited.updated_at > article.updated_at);

    let stale = h
        .service
        .edit_article(article.id, ArticleFields::new("Third", "v3"), 1, author)
        .await;
    assert!(matches!(
        stale,
        Err(DomainError::Conflict {
            current_version: Some(2),
            ..
        })
    ));

    assert_eq!(h.repo.updates.load(Ordering::SeqCst), 1);
    let stored = h.service.get_article(article.id).await.unwrap();
    assert_eq!(stored.title, "Second");
    assert_eq!(stored.content, "<em>v2</em>");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_on_same_version_have_one_winner() {
    let h = harness();
    let author = Uuid::new_v4();
    let article = seed(&h, author).await;

    let calls = (0..8).map(|i| {
        let service = h.service.clone();
        tokio::spawn(async move {
            service
                .edit_article(
                    article.id,
                    ArticleFields::new(format!("Edit {i}"), "body"),
                    1,
                    author,
                )
                .await
        })
    });
    let results: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DomainError::Conflict { .. }))
    );
    assert_eq!(h.service.get_article(article.id).await.unwrap().version, 2);
}

#[tokio::test]
async fn test_edit_by_other_user_is_forbidden_without_write() {
    let h = harness();
    let article = seed(&h, Uuid::new_v4()).await;

    let result = h
        .service
        .edit_article(article.id, fields(), 1, Uuid::new_v4())
        .await;

    assert!(matches!(result, Err(DomainError::Forbidden(_))));
    assert_eq!(h.repo.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_edit_of_missing_article_never_writes() {
    let h = harness();

    let result = h
        .service
        .edit_article(Uuid::new_v4(), fields(), 1, Uuid::new_v4())
        .await;

    assert!(matches!(result, Err(DomainError::NotFound { .. })));
    assert_eq!(h.repo.writes(), 0);
}

#[tokio::test]
async fn test_get_missing_article() {
    let result = harness().service.get_article(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}
