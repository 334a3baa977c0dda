//! HTTP handlers for image upload, listing and deletion.
//! Upload bodies are streamed straight to disk; storage concerns live in
//! `ImageService`.

use crate::{
    errors::AppError,
    models::image::ImageRecord,
    services::image_service::{ImageError, ImageService},
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use serde::Serialize;
use std::io;
use uuid::Uuid;

/// Multipart field carrying the uploaded file.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub image: ImageRecord,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `GET /`
pub async fn root() -> &'static str {
    "Image processing backend is running"
}

/// `POST /upload`: store the `image` file part and its processed copy.
///
/// Only parts named `image` that carry a non-empty filename count as the upload;
/// every other part is skipped.
pub async fn upload_image(
    State(service): State<ImageService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::new(err.status(), err.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // Browsers send `filename=""` when no file was chosen.
        let Some(original_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };
        let content_type = field.content_type().map(str::to_owned);

        let stream = field.map(|chunk| chunk.map_err(io::Error::other));
        let image = service
            .store_upload(&original_name, content_type, stream)
            .await
            .map_err(upload_error)?;

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: "Image uploaded and processed successfully",
                image,
            }),
        ));
    }

    Err(AppError::bad_request("No image file provided"))
}

/// `GET /images`: every record, newest first.
pub async fn list_images(
    State(service): State<ImageService>,
) -> Result<Json<Vec<ImageRecord>>, AppError> {
    let images = service
        .list_images()
        .await
        .map_err(|err| AppError::from_image_error(err, "Error fetching images"))?;
    Ok(Json(images))
}

/// `DELETE /delete/{id}`: remove the record; file cleanup never fails the request.
pub async fn delete_image(
    State(service): State<ImageService>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    // An id that is not a UUID cannot name a record.
    let id = Uuid::parse_str(&id).map_err(|_| AppError::not_found("Image not found"))?;

    service
        .delete_image(id)
        .await
        .map_err(|err| AppError::from_image_error(err, "Error deleting image"))?;

    Ok(Json(MessageResponse {
        message: "Image deleted successfully",
    }))
}

/// Body-read failures surface as I/O errors from the service; report them
/// with the multipart status (413 for an oversized body) instead of a 500.
fn upload_error(err: ImageError) -> AppError {
    if let ImageError::Io(io_err) = &err {
        if let Some(multipart_err) = io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return AppError::new(multipart_err.status(), multipart_err.body_text());
        }
    }
    AppError::from_image_error(err, "Error processing image")
}
