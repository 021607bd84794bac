use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cloudtask_core::app::{ResultsProcessor, Worker, WorkerBuilder};
use cloudtask_core::domain::{JobId, JobMessage, QueueName};
use cloudtask_core::impls::{PostgresJobStore, RedisChannelConfig, RedisStreamsChannel};
use cloudtask_core::jobs::SleepTask;
use cloudtask_core::observability::CountingObserver;
use cloudtask_core::ports::MessageChannel;
use cloudtask_core::typed::Task;

mod config;
mod logging;

use config::{Cli, Command, ConsumerArgs, ResultsArgs, SubmitArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        Command::Worker(args) => run_worker(&cli.broker_url, args).await,
        Command::ResultsProcessor(args) => run_results_processor(&cli.broker_url, args).await,
        Command::Submit(args) => submit(&cli.broker_url, args).await,
        Command::Declare => declare(&cli.broker_url).await,
    }
}

async fn run_worker(broker_url: &str, args: ConsumerArgs) -> Result<()> {
    let config = args.channel_config("worker");
    info!(consumer = %config.consumer, group = %config.group, "starting worker");

    let channel = Arc::new(
        RedisStreamsChannel::connect(broker_url, config)
            .await
            .context("connecting to broker")?,
    );
    let observer = Arc::new(CountingObserver::new());
    let worker = WorkerBuilder::new()
        .with_builtin_jobs()?
        .expect_job_types(&[SleepTask::TYPE])
        .observer(observer.clone())
        .build(channel.clone())?;

    let handled = worker
        .run(shutdown_token())
        .await
        .context("declaring queues")?;
    leave_group(&channel, &Worker::QUEUES).await;
    info!(
        handled,
        counts = %serde_json::to_string(&observer.snapshot())?,
        "worker stopped"
    );
    Ok(())
}

async fn run_results_processor(broker_url: &str, args: ResultsArgs) -> Result<()> {
    let config = args.consumer.channel_config("results");
    info!(consumer = %config.consumer, group = %config.group, "starting results processor");

    let store = PostgresJobStore::connect(&args.database_url, args.max_connections)
        .await
        .context("connecting to job database")?;
    let channel = Arc::new(
        RedisStreamsChannel::connect(broker_url, config)
            .await
            .context("connecting to broker")?,
    );
    let observer = Arc::new(CountingObserver::new());
    let processor = ResultsProcessor::new(channel.clone(), Arc::new(store))
        .with_observer(observer.clone());

    let handled = processor
        .run(shutdown_token())
        .await
        .context("declaring queues")?;
    leave_group(&channel, &ResultsProcessor::QUEUES).await;
    info!(
        handled,
        counts = %serde_json::to_string(&observer.snapshot())?,
        "results processor stopped"
    );
    Ok(())
}

async fn submit(broker_url: &str, args: SubmitArgs) -> Result<()> {
    let channel = producer_channel(broker_url).await?;
    let job_id = args.job_id.map(JobId::new).unwrap_or_else(JobId::generate);
    let message = JobMessage::new(job_id.clone(), args.job_type, args.payload);

    channel.declare(QueueName::JobsCreated).await?;
    channel
        .publish(QueueName::JobsCreated, &message.to_vec()?)
        .await
        .context("publishing job")?;
    info!(job_id = %job_id, job_type = %message.job_type, "job submitted");
    println!("{job_id}");
    Ok(())
}

async fn declare(broker_url: &str) -> Result<()> {
    let channel = producer_channel(broker_url).await?;
    for queue in QueueName::ALL {
        channel
            .declare(queue)
            .await
            .with_context(|| format!("declaring {queue}"))?;
        info!(%queue, "queue declared");
    }
    Ok(())
}

/// Drop this consumer from the group after a clean stop. Best-effort.
async fn leave_group(channel: &RedisStreamsChannel, queues: &[QueueName]) {
    if let Err(e) = channel.release(queues).await {
        warn!(error = %e, "could not leave consumer group");
    }
}

/// Channel for commands that only publish or declare.
async fn producer_channel(broker_url: &str) -> Result<RedisStreamsChannel> {
    let config = RedisChannelConfig::new(format!("cli-{}", ulid::Ulid::new()));
    RedisStreamsChannel::connect(broker_url, config)
        .await
        .context("connecting to broker")
}

/// Token cancelled on the first SIGINT or SIGTERM.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown requested; finishing current message");
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "could not register SIGTERM handler");
            return wait_for_ctrl_c().await;
        }
    };
    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received SIGINT"),
        Err(e) => {
            warn!(error = %e, "could not listen for SIGINT");
            std::future::pending::<()>().await
        }
    }
}
