//! Domain entities - the core business objects.

mod article;
mod idempotency;

pub use article::{
    Article, ArticleChanges, ArticleFields, ArticleStatus, CONTENT_MAX_CHARS, SUMMARY_MAX_CHARS,
    TAGS_MAX_CHARS, TITLE_MAX_CHARS,
};
pub use idempotency::{IdempotencyRecord, RecordState, Reservation};
