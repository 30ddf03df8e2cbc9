use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

use config::Config;
use extraction::{textract::TextractDetector, ExtractionClient};
use pipeline::Pipeline;
use poller::Poller;
use queue::sqs::SqsQueue;
use sentiment::{comprehend::ComprehendDetector, SentimentClient};
use store::{dynamodb::DynamoResultStore, ResultWriter};

pub mod config;
pub mod error;
pub mod extraction;
pub mod message;
pub mod notification;
pub mod pipeline;
pub mod poller;
pub mod queue;
pub mod sentiment;
pub mod store;
pub mod utils;

/// Installs the global subscriber, filtered by `DOCWORKER_LOG`.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_tracing() -> eyre::Result<()> {
    let filter = EnvFilter::builder()
        .with_env_var("DOCWORKER_LOG")
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(filter)
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(filter)
        .finish()
        .try_init()?;

    Ok(())
}

/// Completes on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

/// Builds the AWS-backed pipeline and polls until a shutdown signal arrives.
///
/// Configuration problems are returned before any polling starts.
pub async fn run() -> eyre::Result<()> {
    let config = Config::load()?;

    tracing::info!(
        queue_url = %config.queue_url,
        table = %config.table_name,
        region = %config.aws_region,
        "Starting document worker"
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let pipeline = Pipeline::builder()
        .extraction(ExtractionClient::new(TextractDetector::new(
            aws_sdk_textract::Client::new(&sdk_config),
        )))
        .sentiment(SentimentClient::new(
            ComprehendDetector::new(aws_sdk_comprehend::Client::new(&sdk_config)),
            config.language_code.clone(),
        ))
        .writer(ResultWriter::new(DynamoResultStore::new(
            aws_sdk_dynamodb::Client::new(&sdk_config),
            config.table_name.clone(),
        )))
        .build();

    let queue = SqsQueue::new(aws_sdk_sqs::Client::new(&sdk_config), &config);

    let cancel = CancellationToken::new();

    let poller = Poller::builder()
        .queue(Arc::new(queue))
        .pipeline(Arc::new(pipeline))
        .cancel(cancel.clone())
        .concurrency(config.concurrency)
        .error_backoff(config.error_backoff())
        .maybe_max_receive_count(config.max_receive_count)
        .build();

    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });

    poller.run().await
}
