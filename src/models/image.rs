//! Represents the metadata record of one uploaded image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata describing a single uploaded image.
///
/// The record points at two files in the upload directory: the original
/// upload and its processed copy. It stores their names, not their bytes,
/// and nothing guarantees that either file still exists.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct ImageRecord {
    /// Record identifier.
    pub id: Uuid,

    /// Filename as supplied by the client.
    pub original_name: String,

    /// Name of the original upload on disk, unique per upload.
    pub filename: String,

    /// Path of the original upload on disk.
    pub path: String,

    /// Name of the processed copy, always `processed-` + `filename`.
    pub processed_filename: String,

    /// Content type reported by the client, if any.
    pub content_type: Option<String>,

    /// Size of the original upload in bytes.
    pub size_bytes: i64,

    /// When the record was inserted.
    pub created_at: DateTime<Utc>,
}
