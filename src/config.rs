use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub links: LinkConfig,
    pub sweep: SweepConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Externally reachable base URL, used when building share URLs
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Bucket new uploads land in
    pub bucket: String,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

/// Share link expiry policy.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub default_expire_days: u32,
    /// Ceiling on requested expiries, a guard against configuration errors
    pub max_expire_days: u32,
}

/// Expiry sweeper tuning.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
    /// Most links deactivated / files reaped per iteration
    pub batch_size: usize,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            default_expire_days: 7,
            max_expire_days: 365,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            batch_size: 200,
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            bucket: "file-share".to_string(),
            local_storage_path: "./files".to_string(),
            gcs_credentials_file: None,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{bind_address}"))
            .trim_end_matches('/')
            .to_string();

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let bucket = std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "file-share".to_string());
        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());
        let gcs_credentials_file = std::env::var("GCS_CREDENTIALS_FILE").ok();

        let links = LinkConfig {
            default_expire_days: env_parsed("DEFAULT_EXPIRE_DAYS", 7),
            max_expire_days: env_parsed("MAX_EXPIRE_DAYS", 365),
        };

        let sweep = SweepConfig {
            interval: Duration::from_secs(env_parsed("SWEEP_INTERVAL_SECONDS", 300)),
            batch_size: env_parsed("SWEEP_BATCH_SIZE", 200),
            retry_attempts: env_parsed("SWEEP_RETRY_ATTEMPTS", 3),
            retry_backoff: Duration::from_millis(env_parsed("SWEEP_RETRY_BACKOFF_MS", 500)),
        };

        let max_upload_size = env_parsed("MAX_UPLOAD_SIZE", 50 * 1024 * 1024); // 50MB

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
                public_base_url,
            },
            storage: StorageConfig {
                backend: storage_backend,
                bucket,
                local_storage_path,
                gcs_credentials_file,
            },
            links,
            sweep,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.is_empty() {
            return Err(ConfigError::ValidationError(
                "STORAGE_BUCKET cannot be empty".to_string(),
            ));
        }

        if self.links.default_expire_days == 0
            || self.links.default_expire_days > self.links.max_expire_days
        {
            return Err(ConfigError::ValidationError(format!(
                "DEFAULT_EXPIRE_DAYS must be between 1 and {}",
                self.links.max_expire_days
            )));
        }

        if self.sweep.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "SWEEP_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.sweep.retry_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "SWEEP_RETRY_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        if self.sweep.interval < Duration::from_secs(1) {
            tracing::warn!(
                "Sweep interval below 1s will hammer the metadata store; \
                 consider raising SWEEP_INTERVAL_SECONDS."
            );
        }

        Ok(())
    }
}
