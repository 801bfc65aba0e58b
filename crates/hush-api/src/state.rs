//! Application state.

use std::sync::Arc;

use hush_media::check_program;
use hush_metadata::RestMetadataStore;
use hush_pipeline::{Orchestrator, PipelineConfig, UploadGateway};
use hush_storage::S3BlobStore;
use tracing::{info, warn};

use crate::auth::{Authenticator, JwtAuthenticator};
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(config: ApiConfig, orchestrator: Orchestrator, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            config,
            orchestrator,
            auth,
        }
    }

    /// Build the production backends from the environment.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let blobs = S3BlobStore::from_env()?;
        info!(bucket = %blobs.bucket(), "Object store configured");

        let metadata = RestMetadataStore::from_env()?;
        info!(table = %metadata.table(), "Metadata store configured");

        let pipeline_config = PipelineConfig::from_env();
        info!(
            scratch_dir = %pipeline_config.scratch_dir.display(),
            max_runs = pipeline_config.max_concurrent_runs,
            "Pipeline configured"
        );
        for program in [&pipeline_config.ffmpeg_path, &pipeline_config.enhancer_program] {
            if let Err(e) = check_program(program) {
                warn!("{}; uploads will fail until it is installed", e);
            }
        }

        let gateway = UploadGateway::new(Arc::new(blobs), Arc::new(metadata));
        let orchestrator = Orchestrator::from_config(&pipeline_config, gateway);
        let auth = JwtAuthenticator::from_env()?;

        Ok(Self::new(config, orchestrator, Arc::new(auth)))
    }
}
