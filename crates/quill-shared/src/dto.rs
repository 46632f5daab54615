//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a new article.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "content must be 1-10000 characters"))]
    pub content: String,
    #[validate(length(max = 300, message = "summary must be at most 300 characters"))]
    pub summary: Option<String>,
    #[validate(length(max = 200, message = "tags must be at most 200 characters"))]
    pub tags: Option<String>,
}

/// Request to edit an article the caller owns.
///
/// `version` is the version the client last read.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditArticleRequest {
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "content must be 1-10000 characters"))]
    pub content: String,
    #[validate(length(max = 300, message = "summary must be at most 300 characters"))]
    pub summary: Option<String>,
    #[validate(length(max = 200, message = "tags must be at most 200 characters"))]
    pub tags: Option<String>,
    #[validate(range(min = 1, message = "version must be positive"))]
    pub version: i64,
}

/// An article as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    pub status: String,
    pub author_id: String,
    pub author_name: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(title: &str) -> CreateArticleRequest {
        CreateArticleRequest {
            title: title.to_string(),
            content: "Body".to_string(),
            summary: None,
            tags: None,
        }
    }

    #[test]
    fn test_create_request_limits() {
        assert!(create("Title").validate().is_ok());
        assert!(create("").validate().is_err());
        assert!(create(&"t".repeat(101)).validate().is_err());

        let mut long_tags = create("Title");
        long_tags.tags = Some("t".repeat(201));
        assert!(long_tags.validate().is_err());
    }

    #[test]
    fn test_edit_request_requires_positive_version() {
        let req = EditArticleRequest {
            title: "Title".to_string(),
            content: "Body".to_string(),
            summary: None,
            tags: None,
            version: 0,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("version"));
    }
}
