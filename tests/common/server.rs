//! Server test utilities.

use image_store::{ImageService, db, routes};
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;

/// Small enough to exercise the limit, large enough for every fixture.
pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// A router wired to a throwaway upload directory and SQLite file.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub service: ImageService,
    pub upload_dir: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("Failed to create upload directory");

        let db_url = format!("sqlite://{}", temp_dir.path().join("images.db").display());
        let pool = db::connect(&db_url)
            .await
            .expect("Failed to open database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = ImageService::new(Arc::new(pool), upload_dir.clone());
        let router = routes(service.clone(), TEST_MAX_UPLOAD_BYTES);

        Self {
            router,
            service,
            upload_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Number of records currently stored.
    pub async fn record_count(&self) -> usize {
        self.service
            .list_images()
            .await
            .expect("Failed to list images")
            .len()
    }

    /// Names of the regular files in the upload directory, sorted.
    pub fn files_on_disk(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .expect("Failed to read upload directory")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
