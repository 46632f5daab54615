//! Article handlers.

use actix_web::{HttpResponse, http::header, web};
use uuid::Uuid;
use validator::Validate;

use quill_core::domain::{Article, ArticleFields};
use quill_shared::ApiResponse;
use quill_shared::dto::{ArticleResponse, CreateArticleRequest, EditArticleRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::middleware::idempotency::IdempotencyKey;
use crate::state::AppState;

fn to_response(article: Article) -> ArticleResponse {
    ArticleResponse {
        id: article.id.to_string(),
        title: article.title,
        content: article.content,
        summary: article.summary,
        tags: article.tags,
        status: article.status.to_string(),
        author_id: article.author_id.to_string(),
        author_name: article.author_name,
        version: article.version,
        created_at: article.created_at.to_rfc3339(),
        updated_at: article.updated_at.to_rfc3339(),
    }
}

/// POST /api/articles
///
/// A retry carrying the same `X-Idempotency-Key` gets `200 OK` with the
/// article created by the first request.
pub async fn create_article(
    state: web::Data<AppState>,
    identity: Identity,
    key: IdempotencyKey,
    body: web::Json<CreateArticleRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let fields = ArticleFields {
        title: req.title,
        content: req.content,
        summary: req.summary,
        tags: req.tags,
    };

    let outcome = state
        .articles
        .create_article(fields, identity.user_id, &identity.username, key.as_deref())
        .await?;

    let location = format!("/api/articles/{}", outcome.article.id);
    let article = to_response(outcome.article);

    if outcome.replayed {
        Ok(HttpResponse::Ok()
            .insert_header((header::LOCATION, location))
            .json(ApiResponse::ok_with_message(
                article,
                "Request already processed; returning the original article",
            )))
    } else {
        Ok(HttpResponse::Created()
            .insert_header((header::LOCATION, location))
            .json(ApiResponse::ok(article)))
    }
}

/// PUT /api/articles/{id}
pub async fn edit_article(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<EditArticleRequest>,
) -> AppResult<HttpResponse> {
    let article_id = path.into_inner();
    let req = body.into_inner();
    req.validate()?;

    let fields = ArticleFields {
        title: req.title,
        content: req.content,
        summary: req.summary,
        tags: req.tags,
    };

    let article = state
        .articles
        .edit_article(article_id, fields, req.version, identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(article))))
}

/// GET /api/articles/{id} - public
pub async fn get_article(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let article = state.articles.get_article(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(article))))
}
