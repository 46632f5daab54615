//! HTTP handlers and route configuration.

mod articles;
mod health;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/articles")
                    .route("", web::post().to(articles::create_article))
                    .route("/{id}", web::get().to(articles::get_article))
                    .route("/{id}", web::put().to(articles::edit_article)),
            ),
    );
}
