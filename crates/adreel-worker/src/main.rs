use std::sync::Arc;

use tracing::info;

use adreel_ai_client::{MediaGenerationClient, PromptMutationClient};
use adreel_db::{CampaignStore, RedisCampaignStore};
use adreel_queue::{JobQueue, JobStatusStore, RedisStatusStore};
use adreel_storage::{ObjectStore, S3Store};
use adreel_worker::pipeline::{PromptMutator, SceneGenerator};
use adreel_worker::render::Compositor;
use adreel_worker::{EditPipeline, FfmpegCompositor, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    info!(consumer = %config.consumer_name, "Starting adreel worker");

    let campaigns: Arc<dyn CampaignStore> = Arc::new(RedisCampaignStore::from_env()?);
    let storage: Arc<dyn ObjectStore> = Arc::new(S3Store::from_env()?);
    let status: Arc<dyn JobStatusStore> = Arc::new(RedisStatusStore::from_env()?);
    let mutator: Arc<dyn PromptMutator> = Arc::new(PromptMutationClient::from_env()?);
    let generator: Arc<dyn SceneGenerator> = Arc::new(MediaGenerationClient::from_env()?);
    let compositor: Arc<dyn Compositor> = Arc::new(FfmpegCompositor::new(
        config.ffmpeg_path.clone(),
        config.work_dir.clone(),
    ));

    let queue = Arc::new(JobQueue::from_env()?);
    queue.init().await?;

    let pipeline = Arc::new(EditPipeline::new(
        campaigns.clone(),
        storage,
        status.clone(),
        mutator,
        generator,
        compositor,
        config.lease_ttl,
    ));
    let executor = JobExecutor::new(queue, pipeline, campaigns, status, config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown_tx.send(true).ok();
        }
    });

    executor.run(shutdown_rx).await;
    info!("Worker stopped");
    Ok(())
}
