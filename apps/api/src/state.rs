use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::blobs::{BlobStore, InMemoryBlobStore, S3BlobStore};
use crate::config::{Backend, Config};
use crate::db::create_pool;
use crate::identity::{HostedIdentityProvider, IdentityProvider};
use crate::records::{InMemoryRecordStore, PgRecordStore, RecordStore};
use crate::sessions::{InMemorySessionStore, RedisSessionStore, SessionStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
}

impl AppState {
    /// Connects every backend named by the config.
    pub async fn connect(config: Config) -> Result<Self> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(HostedIdentityProvider::new(
            config.identity_endpoint.clone(),
            config.identity_api_key.clone(),
        ));
        info!("Identity provider at {}", config.identity_endpoint);

        let state = match &config.backend {
            Backend::Hosted(hosted) => {
                let pool = create_pool(&hosted.database_url).await?;

                let redis = redis::Client::open(hosted.redis_url.clone())?;
                info!("Redis session store initialized");

                let blobs = S3BlobStore::connect(hosted).await;
                info!("S3 blob store initialized (bucket: {})", hosted.s3_bucket);

                AppState {
                    records: Arc::new(PgRecordStore::new(pool)),
                    blobs: Arc::new(blobs),
                    identity,
                    sessions: Arc::new(RedisSessionStore::new(redis, config.session_ttl_secs)),
                    config: config.clone(),
                }
            }
            Backend::Memory => {
                tracing::warn!("Using in-memory stores; data is lost on restart");
                AppState {
                    records: Arc::new(InMemoryRecordStore::new()),
                    blobs: Arc::new(InMemoryBlobStore::new()),
                    identity,
                    sessions: Arc::new(InMemorySessionStore::new(config.session_ttl_secs)),
                    config: config.clone(),
                }
            }
        };

        Ok(state)
    }
}
