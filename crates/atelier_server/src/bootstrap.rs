//! Assemble a [`TaskOrchestrator`] from configuration.

use atelier_core::MediaKind;
use atelier_database::{InMemoryTaskStore, InMemoryUsageStore};
use atelier_error::AtelierResult;
use atelier_interface::{TaskStore, UsageStore};
use atelier_models::provider_from_config;
use atelier_orchestrator::{OrchestratorConfig, StaticPlanDirectory, TaskOrchestrator};
use atelier_rate_limit::{AtelierConfig, KeyedAdmission};
use atelier_storage::{ArtifactUploader, FileSystemObjectStore, ReqwestFetcher};
use std::sync::Arc;
use tracing::{info, warn};

/// Where task rows and usage records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local stores; state is lost on restart
    Memory,
    /// PostgreSQL through a pooled diesel connection
    #[cfg(feature = "postgres")]
    Postgres {
        /// Connection URL
        database_url: String,
        /// Maximum pooled connections
        pool_size: u32,
    },
}

type Stores = (Arc<dyn TaskStore>, Arc<dyn UsageStore>);

fn open_stores(backend: &StoreBackend) -> AtelierResult<Stores> {
    match backend {
        StoreBackend::Memory => {
            info!("Using in-memory task and usage stores");
            Ok((
                Arc::new(InMemoryTaskStore::new()),
                Arc::new(InMemoryUsageStore::new()),
            ))
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres {
            database_url,
            pool_size,
        } => {
            let pool = atelier_database::connect(database_url, *pool_size)?;
            atelier_database::run_migrations(&pool)?;
            Ok((
                Arc::new(atelier_database::PgTaskStore::new(pool.clone())),
                Arc::new(atelier_database::PgUsageStore::new(pool)),
            ))
        }
    }
}

/// Filesystem CDN store and the uploader writing into it.
pub fn build_uploader(
    config: &AtelierConfig,
) -> AtelierResult<(ArtifactUploader, Arc<FileSystemObjectStore>)> {
    let store = Arc::new(FileSystemObjectStore::new(
        &config.upload.root,
        &config.upload.public_base_url,
    )?);
    let uploader = ArtifactUploader::new(
        store.clone(),
        Arc::new(ReqwestFetcher::new(reqwest::Client::new())),
        config.retry,
        config.upload.category.clone(),
    );
    Ok((uploader, store))
}

/// Per-(user, address) admission limiter.
pub fn build_admission(config: &AtelierConfig) -> AtelierResult<Arc<KeyedAdmission>> {
    Ok(Arc::new(KeyedAdmission::new(config.admission)?))
}

/// Orchestrator with every provider whose API key is available.
///
/// A provider whose key is missing is skipped with a warning; requests for that
/// media kind then fail until it is configured.
pub fn build_orchestrator(
    config: &AtelierConfig,
    backend: &StoreBackend,
    uploader: ArtifactUploader,
    admission: Arc<KeyedAdmission>,
) -> AtelierResult<TaskOrchestrator> {
    let (tasks, usage) = open_stores(backend)?;
    let plans = Arc::new(StaticPlanDirectory::from_config(config));

    let mut orchestrator = TaskOrchestrator::new(
        OrchestratorConfig::from_config(config),
        tasks,
        usage,
        uploader,
        plans,
    )
    .with_admission(admission);

    for kind in [MediaKind::Image, MediaKind::Video] {
        let Some(provider_config) = config.provider(kind) else {
            continue;
        };
        match provider_from_config(provider_config, config.retry) {
            Ok(provider) => {
                info!(media = %kind, provider = provider.name(), "Registered provider");
                orchestrator = orchestrator.with_provider(kind, provider);
            }
            Err(e) => warn!(media = %kind, error = %e, "Provider not registered"),
        }
    }

    Ok(orchestrator)
}
