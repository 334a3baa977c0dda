//! src/services/image_service.rs
//!
//! ImageService: upload, list and delete operations backed by SQLite for
//! metadata and a single local directory for the image bytes. The database
//! and the filesystem are not tied together transactionally: a record can
//! outlive its files and files can outlive a failed insert.

use crate::models::image::ImageRecord;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::{Stream, StreamExt, pin_mut};
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix that turns a stored filename into its processed counterpart.
pub const PROCESSED_PREFIX: &str = "processed-";

const FALLBACK_FILENAME: &str = "upload";
const MAX_FILENAME_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image `{0}` not found")]
    ImageNotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ImageResult<T> = Result<T, ImageError>;

/// ImageService provides the operations behind the HTTP surface:
/// - Store an upload (writes bytes, writes the processed copy, inserts a record)
/// - List records newest first
/// - Delete a record and best-effort remove its files
#[derive(Clone)]
pub struct ImageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Directory holding original uploads and processed copies.
    pub upload_dir: PathBuf,
}

impl ImageService {
    pub fn new(db: Arc<SqlitePool>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            upload_dir: upload_dir.into(),
        }
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        self.upload_dir.join(filename)
    }

    /// Stream an upload to disk, produce its processed copy and insert the record.
    ///
    /// Bytes are written to a temporary file, fsynced and renamed into place.
    /// Any failure after that point removes the files written so far before
    /// returning the error.
    pub async fn store_upload<S>(
        &self,
        original_name: &str,
        content_type: Option<String>,
        stream: S,
    ) -> ImageResult<ImageRecord>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        fs::create_dir_all(&self.upload_dir).await?;

        let filename = stored_filename(original_name);
        let processed = processed_filename(&filename);
        let file_path = self.file_path(&filename);
        let processed_path = self.file_path(&processed);

        let size_bytes = self.write_stream(&file_path, stream).await?;

        // Processing is a stand-in: the derived file is a byte-identical copy.
        if let Err(err) = self.copy_into_place(&file_path, &processed_path).await {
            remove_quietly(&file_path).await;
            return Err(err);
        }

        let draft = ImageRecord {
            id: Uuid::new_v4(),
            original_name: original_name.to_string(),
            filename,
            path: file_path.to_string_lossy().into_owned(),
            processed_filename: processed,
            content_type,
            size_bytes,
            created_at: Utc::now(),
        };

        match self.insert_record(&draft).await {
            Ok(record) => {
                info!(
                    "stored image {} as {} ({} bytes)",
                    record.id, record.filename, record.size_bytes
                );
                Ok(record)
            }
            Err(err) => {
                remove_quietly(&file_path).await;
                remove_quietly(&processed_path).await;
                Err(ImageError::Sqlx(err))
            }
        }
    }

    /// Insert `record` as given. `created_at` is stored as fixed-width
    /// RFC 3339 text so that text order is time order.
    async fn insert_record(&self, record: &ImageRecord) -> Result<ImageRecord, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            r#"
            INSERT INTO images (
                id, original_name, filename, path, processed_filename,
                content_type, size_bytes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, original_name, filename, path, processed_filename,
                      content_type, size_bytes, created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.original_name)
        .bind(&record.filename)
        .bind(&record.path)
        .bind(&record.processed_filename)
        .bind(&record.content_type)
        .bind(record.size_bytes)
        .bind(timestamp_text(record.created_at))
        .fetch_one(&*self.db)
        .await
    }

    /// Copy `src` to `dest` through a temp file so `dest` only ever holds
    /// complete bytes.
    async fn copy_into_place(&self, src: &Path, dest: &Path) -> ImageResult<()> {
        let tmp_path = self.temp_path();
        if let Err(err) = fs::copy(src, &tmp_path).await {
            remove_quietly(&tmp_path).await;
            return Err(ImageError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, dest).await {
            remove_quietly(&tmp_path).await;
            return Err(ImageError::Io(err));
        }
        Ok(())
    }

    /// Hidden in-flight name inside the upload dir; `/uploads` refuses dot-names.
    fn temp_path(&self) -> PathBuf {
        self.upload_dir.join(format!(".tmp-{}", Uuid::new_v4()))
    }

    /// Write `stream` to `dest` through a temp file and return the byte count.
    async fn write_stream<S>(&self, dest: &Path, stream: S) -> ImageResult<i64>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let tmp_path = self.temp_path();
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    remove_quietly(&tmp_path).await;
                    return Err(ImageError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            if let Err(err) = file.write_all(&chunk).await {
                remove_quietly(&tmp_path).await;
                return Err(ImageError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            remove_quietly(&tmp_path).await;
            return Err(ImageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            remove_quietly(&tmp_path).await;
            return Err(ImageError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, dest).await {
            remove_quietly(&tmp_path).await;
            return Err(ImageError::Io(err));
        }

        Ok(size_bytes)
    }

    /// All records, newest first. Exact timestamp ties fall back to
    /// reverse insertion order.
    pub async fn list_images(&self) -> ImageResult<Vec<ImageRecord>> {
        let rows = sqlx::query_as::<_, ImageRecord>(
            "SELECT id, original_name, filename, path, processed_filename,
                    content_type, size_bytes, created_at
             FROM images
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(rows)
    }

    /// Fetch a single record. Returns ImageNotFound if missing.
    #[cfg(test)]
    async fn get_image(&self, id: Uuid) -> ImageResult<ImageRecord> {
        sqlx::query_as::<_, ImageRecord>(
            "SELECT id, original_name, filename, path, processed_filename,
                    content_type, size_bytes, created_at
             FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => ImageError::ImageNotFound(id),
            other => ImageError::Sqlx(other),
        })
    }

    /// Delete a record, then remove its original and processed files.
    ///
    /// File removal never fails the call: missing files are logged at
    /// debug, other I/O errors at warn.
    pub async fn delete_image(&self, id: Uuid) -> ImageResult<ImageRecord> {
        let record = sqlx::query_as::<_, ImageRecord>(
            "DELETE FROM images WHERE id = ?
             RETURNING id, original_name, filename, path, processed_filename,
                       content_type, size_bytes, created_at",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ImageError::ImageNotFound(id))?;

        for name in [&record.filename, &record.processed_filename] {
            let path = self.file_path(name);
            match fs::remove_file(&path).await {
                Ok(_) => debug!("removed file {}", path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("file {} already missing", path.display());
                }
                Err(err) => warn!("failed to remove file {}: {}", path.display(), err),
            }
        }

        info!("deleted image {}", record.id);
        Ok(record)
    }
}

/// Build the on-disk name for an upload: a random token followed by the
/// sanitized client filename, so concurrent uploads never collide.
pub fn stored_filename(original_name: &str) -> String {
    format!(
        "{}-{}",
        Uuid::new_v4().simple(),
        sanitize_filename(original_name)
    )
}

/// `2026-10-18T12:00:00.000400000Z`: nanosecond precision, always the same width.
fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Name of the processed copy of `stored`.
pub fn processed_filename(stored: &str) -> String {
    format!("{}{}", PROCESSED_PREFIX, stored)
}

/// Reduce a client filename to a single safe path component.
///
/// Drops any directory part, replaces characters outside `[A-Za-z0-9._-]`
/// with `_`, strips leading dots and caps the length. An empty result
/// becomes `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed: String = cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != ErrorKind::NotFound {
            debug!("cleanup of {} failed: {}", path.display(), err);
        }
    }
}
