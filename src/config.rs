use std::env;
use anyhow::{Context, Result, bail};

/// Connection settings for the Spanner backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    /// Full resource path of the configured database
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

/// Which storage backend serves the product table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Spanner(SpannerConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub service_port: u16,
    pub service_host: String,
    pub scan_page_size: usize,
    pub scan_max_pages: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend_name = env::var("STORE_BACKEND").unwrap_or_else(|_| "spanner".to_string());

        let store_backend = match backend_name.as_str() {
            "spanner" => StoreBackend::Spanner(spanner_from_env()?),
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be one of: spanner, memory, got '{}'", other),
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let scan_page_size = positive_from_env("SCAN_PAGE_SIZE", 100)?;
        let scan_max_pages = positive_from_env("SCAN_MAX_PAGES", 10_000)?;

        Ok(Config {
            store_backend,
            service_port,
            service_host,
            scan_page_size,
            scan_max_pages,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.store_backend {
            StoreBackend::Spanner(spanner) => {
                tracing::info!("  Store backend: spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner project: {}", spanner.project);
                tracing::info!("  Spanner instance: {}", spanner.instance);
                tracing::info!("  Spanner database: {}", spanner.database);
            }
            StoreBackend::Memory => {
                tracing::info!("  Store backend: memory (data is lost on exit)");
            }
        }
        tracing::info!("  Scan page size: {}, max pages: {}", self.scan_page_size, self.scan_max_pages);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

fn spanner_from_env() -> Result<SpannerConfig> {
    let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

    let project = env::var("SPANNER_PROJECT")
        .context("SPANNER_PROJECT environment variable is required")?;

    let instance = env::var("SPANNER_INSTANCE")
        .context("SPANNER_INSTANCE environment variable is required")?;

    let database = env::var("SPANNER_DATABASE")
        .context("SPANNER_DATABASE environment variable is required")?;

    Ok(SpannerConfig {
        emulator_host,
        project,
        instance,
        database,
    })
}

fn positive_from_env(name: &str, default: usize) -> Result<usize> {
    let value = match env::var(name) {
        Ok(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("{} must be a positive integer", name))?,
        Err(_) => default,
    };
    if value == 0 {
        bail!("{} must be a positive integer", name);
    }
    Ok(value)
}
