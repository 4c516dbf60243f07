//! Process entry point: loads configuration, wires the repository, queue
//! transport, channel router and delivery worker together, mounts the
//! HTTP API, and runs until `ctrl_c`.

use clap::Parser;
use message_hub_api::AppState;
use message_hub_core::{ChannelRouter, DeliveryWorker, HubConfig, QueueTransportKind, SubmissionHandler};
use message_hub_queue::{InProcessQueueTransport, QueueTransport};
use message_hub_repository::{InMemoryMessageRepository, MessageRepository};
use std::sync::Arc;
use std::time::Duration;

/// Multi-tenant SMS message hub.
#[derive(Debug, Parser)]
#[command(name = "message-hub", about = "Multi-tenant SMS message hub")]
struct Cli {
    /// Path to the configuration file (TOML/YAML), without extension.
    #[arg(long, env = "MSGHUB_CONFIG_PATH")]
    config: Option<String>,

    /// Tracing filter, e.g. "info" or "message_hub_core=debug,info".
    #[arg(long, env = "MSGHUB_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

const RATE_LIMITER_IDLE_AFTER: Duration = Duration::from_secs(600);
const DLR_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = Arc::new(HubConfig::load(cli.config.as_deref())?);
    tracing::info!(tenants = config.tenants.len(), "configuration loaded");

    let repository: Arc<dyn MessageRepository> = Arc::new(InMemoryMessageRepository::new());

    let queue: Arc<dyn QueueTransport> = match config.queue_transport {
        QueueTransportKind::InProcess => {
            let transport = Arc::new(InProcessQueueTransport::new(1024, 5));
            let dead_letter_repository = Arc::clone(&repository);
            transport.dead_letter().set_hook(Arc::new(move |event, _attempts| {
                let repository = Arc::clone(&dead_letter_repository);
                Box::pin(async move {
                    if let Err(err) = repository
                        .update_status(
                            event.message_id,
                            message_hub_domain::MessageStatus::Failed,
                            None,
                            Some("redelivery budget exhausted".to_string()),
                        )
                        .await
                    {
                        tracing::error!(%err, message_id = %event.message_id, "failed to mark dead-lettered message as failed");
                    }
                })
            }));
            transport
        }
        QueueTransportKind::DurableBroker => {
            anyhow::bail!("durable broker queue transport is not implemented yet")
        }
    };

    let router = Arc::new(ChannelRouter::new());
    let dlr_repository = Arc::clone(&repository);
    router.set_smpp_dlr_hook(Arc::new(move |internal_message_id, status| {
        let repository = Arc::clone(&dlr_repository);
        Box::pin(async move {
            let Ok(message_id) = uuid::Uuid::parse_str(&internal_message_id) else {
                tracing::error!(%internal_message_id, "DLR correlation held a non-UUID message id");
                return;
            };
            if let Err(err) = repository.update_status(message_id, status, None, None).await {
                tracing::error!(%err, %message_id, "failed to apply SMPP delivery receipt");
            }
        })
    }));
    let worker = Arc::new(DeliveryWorker::new(
        Arc::clone(&config),
        Arc::clone(&repository),
        Arc::clone(&router),
    ));

    queue.subscribe(Arc::new(move |event| {
        let worker = Arc::clone(&worker);
        Box::pin(async move { worker.handle(event).await })
    }));

    spawn_sweepers(Arc::clone(&router));

    let submission = Arc::new(SubmissionHandler::new(
        Arc::clone(&config),
        Arc::clone(&repository),
        Arc::clone(&queue),
    ));

    let state = AppState {
        config: Arc::clone(&config),
        submission,
        repository,
    };
    let app = message_hub_api::router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address.as_str()).await?;
    tracing::info!(bind_address = %config.server.bind_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn spawn_sweepers(router: Arc<ChannelRouter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DLR_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            router.sweep_idle(RATE_LIMITER_IDLE_AFTER, DLR_SWEEP_INTERVAL);
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("ctrl_c received, shutting down"),
        Err(err) => tracing::error!(%err, "failed to install ctrl_c handler"),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
