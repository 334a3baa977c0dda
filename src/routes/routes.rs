//! Defines the HTTP surface of the image backend.
//!
//! ## Structure
//! - `GET    /`: plaintext welcome
//! - `POST   /upload`: multipart upload, file field `image`
//! - `GET    /images`: list records, newest first
//! - `DELETE /delete/{id}`: delete a record and its files
//! - `GET    /uploads/{*file}`: static bytes from the upload directory
//! - `GET    /healthz`, `GET /readyz`: probes

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{delete_image, list_images, root, upload_image},
    },
    services::image_service::ImageService,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{MethodRouter, delete, get, get_service, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Build the application router with its state attached.
///
/// `max_upload_bytes` replaces axum's default body limit on `/upload`.
pub fn routes(service: ImageService, max_upload_bytes: usize) -> Router {
    let uploads: MethodRouter = get_service(ServeDir::new(&service.upload_dir))
        .layer(middleware::from_fn(hide_dot_entries));

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/upload",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/images", get(list_images))
        .route("/delete/{id}", delete(delete_image))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// In-flight `.tmp-*` writes and `.readyz-*` probes share the upload dir;
/// any path segment starting with a dot answers 404.
async fn hide_dot_entries(req: Request, next: Next) -> Response {
    let hidden = req.uri().path().split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|head| head.eq_ignore_ascii_case("%2e"))
    });
    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(req).await
}
