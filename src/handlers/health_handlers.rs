//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> readiness: SQLite round-trip plus a probe file in the upload dir

use crate::services::image_service::ImageService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

const PROBE_BYTES: &[u8] = b"readyz";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn pass() -> Self {
        Self { ok: true, error: None }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// HTTP 200 when every check passes, HTTP 503 otherwise. The body lists
/// each check with its error, if any.
pub async fn readyz(State(service): State<ImageService>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("sqlite", check_sqlite(&service).await);
    checks.insert("upload_dir", check_upload_dir(&service.upload_dir).await);

    let ready = checks.values().all(|c| c.ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        checks,
    };

    (status, Json(body))
}

async fn check_sqlite(service: &ImageService) -> CheckStatus {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*service.db)
        .await
    {
        Ok(1) => CheckStatus::pass(),
        Ok(v) => CheckStatus::fail(format!("unexpected result: {}", v)),
        Err(e) => CheckStatus::fail(format!("error: {}", e)),
    }
}

async fn check_upload_dir(dir: &Path) -> CheckStatus {
    let probe = dir.join(format!(".readyz-{}", Uuid::new_v4()));

    let outcome = match fs::write(&probe, PROBE_BYTES).await {
        Err(e) => return CheckStatus::fail(format!("could not write probe file: {}", e)),
        Ok(()) => match fs::read(&probe).await {
            Ok(bytes) if bytes == PROBE_BYTES => CheckStatus::pass(),
            Ok(_) => CheckStatus::fail("probe file content mismatch"),
            Err(e) => CheckStatus::fail(format!("could not read probe file: {}", e)),
        },
    };

    if let Err(e) = fs::remove_file(&probe).await {
        tracing::debug!("could not remove probe file {}: {}", probe.display(), e);
    }
    outcome
}
