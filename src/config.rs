use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image upload and processing backend")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded and processed images are written (overrides IMAGE_STORE_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Database URL (overrides IMAGE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Maximum request body size for uploads (overrides IMAGE_STORE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::from_args(args)?, migrate))
    }

    /// Merge already-parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        let env_host = env::var("IMAGE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_or("IMAGE_STORE_PORT", 5000u16)?;
        let env_upload_dir =
            env::var("IMAGE_STORE_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
        let env_db = env::var("IMAGE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/image_store.db".into());
        let env_max_upload = env_or("IMAGE_STORE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or_else(|| env_upload_dir.into()),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a numeric variable, falling back to `default` when it is unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
