use anyhow::Result;
use image_store::{ImageService, config::AppConfig, db, routes};
use std::{io::ErrorKind, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting image-store with config: {:?}", cfg);

    // --- Ensure upload directory exists ---
    if !fs::try_exists(&cfg.upload_dir).await.unwrap_or(false) {
        fs::create_dir_all(&cfg.upload_dir).await?;
        tracing::info!("Created upload directory at {}", cfg.upload_dir.display());
    }

    // --- Initialize SQLite + schema ---
    let pool = db::connect(&cfg.database_url).await?;
    db::run_migrations(&pool).await?;

    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    let service = ImageService::new(Arc::new(pool), cfg.upload_dir.clone());
    let app = routes(service, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
