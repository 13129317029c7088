// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `bifrost-worker` — the Worker Runtime (C6) process. Spawned by the
//! daemon's `WorkerPoolManager`/`ProcessWorkerRuntime`, but self-consumes
//! dispatch messages directly from the broker rather than waiting on
//! anything pushed over stdin. One execution in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing::{error, info, warn};

use bifrost_orchestrator_core::application::authorization::{AuthorizationResolver, StandardAuthorizationResolver};
use bifrost_orchestrator_core::application::log_fanout::{LogFanout, ResultInbox, UpdateChannel};
use bifrost_orchestrator_core::application::worker_runtime::{handle_dispatch, WorkerExecutionContext};
use bifrost_orchestrator_core::domain::dispatch::DispatchMessage;
use bifrost_orchestrator_core::domain::repository::{AccessRepository, ExecutionLogRepository, ExecutionRepository, WorkflowRepository};
use bifrost_orchestrator_core::infrastructure::broker;
use bifrost_orchestrator_core::infrastructure::cancellation::RepositoryCancellationWatcher;
use bifrost_orchestrator_core::infrastructure::db::Database;
use bifrost_orchestrator_core::infrastructure::echo_script_runtime::EchoScriptRuntime;
use bifrost_orchestrator_core::infrastructure::module_cache::RedisModuleCache;
use bifrost_orchestrator_core::infrastructure::redis_pubsub::{RedisResultInbox, RedisUpdateChannel};
use bifrost_orchestrator_core::infrastructure::redis_queue::RedisQueueTracker;
use bifrost_orchestrator_core::infrastructure::redis_store::RedisPendingStore;
use bifrost_orchestrator_core::infrastructure::redis_worker_state::RedisWorkerState;
use bifrost_orchestrator_core::infrastructure::repositories::{
    postgres_access::PostgresAccessRepository, postgres_execution::PostgresExecutionRepository,
    postgres_execution_log::PostgresExecutionLogRepository, postgres_workflow::PostgresWorkflowRepository,
};

use bifrost_orchestrator::config::BifrostConfig;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const SYNC_RESULT_TTL_SECONDS: u64 = 120;

#[derive(Parser)]
#[command(name = "bifrost-worker")]
struct Args {
    /// Worker slot id assigned by the pool manager, used for heartbeats
    #[arg(long)]
    worker_id: u32,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, env = "BIFROST_CONFIG_PATH")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let args = Args::parse();
    let config = BifrostConfig::load(args.config).context("failed to load configuration")?;
    config.validate().context("configuration validation failed")?;

    info!(worker_id = args.worker_id, "bifrost-worker starting");

    let database = Database::new(&config.database_url).await.context("failed to connect to Postgres")?;
    let pool = database.get_pool().clone();

    let redis_client = redis::Client::open(config.redis_url.as_str()).context("invalid redis_url")?;
    let redis_conn = redis_client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to Redis")?;

    let amqp_pool = broker::build_pool(&config.amqp_url).context("failed to build AMQP connection pool")?;

    let workflow_repository: Arc<dyn WorkflowRepository> = Arc::new(PostgresWorkflowRepository::new(pool.clone()));
    let execution_repository: Arc<dyn ExecutionRepository> = Arc::new(PostgresExecutionRepository::new(pool.clone()));
    let log_repository: Arc<dyn ExecutionLogRepository> = Arc::new(PostgresExecutionLogRepository::new(pool.clone()));
    let access_repository: Arc<dyn AccessRepository> = Arc::new(PostgresAccessRepository::new(pool.clone()));

    let update_channel: Arc<dyn UpdateChannel> = Arc::new(RedisUpdateChannel::new(redis_conn.clone()));
    let result_inbox: Arc<dyn ResultInbox> = Arc::new(RedisResultInbox::new(redis_conn.clone()));

    let pending_reader = Arc::new(RedisPendingStore::new(redis_conn.clone()));
    let queue_tracker = Arc::new(RedisQueueTracker::new(redis_conn.clone(), update_channel.clone()));
    let worker_state = Arc::new(RedisWorkerState::new(redis_conn.clone()));
    let module_cache = RedisModuleCache::new(redis_conn.clone());

    let log_fanout = Arc::new(LogFanout::new(log_repository, update_channel, result_inbox));

    let authorization: Arc<dyn AuthorizationResolver> = Arc::new(StandardAuthorizationResolver::new(access_repository));
    let cancellation_watcher = Arc::new(RepositoryCancellationWatcher::new(execution_repository.clone()));

    let ctx = WorkerExecutionContext {
        workflow_repository,
        execution_repository,
        log_fanout,
        pending_reader,
        queue_tracker,
        cancellation_watcher,
        authorization,
        script_runtime: Arc::new(EchoScriptRuntime::new(module_cache)),
        sync_result_ttl_seconds: SYNC_RESULT_TTL_SECONDS,
    };

    spawn_heartbeat_loop(worker_state, args.worker_id);

    let consumer_tag = format!("bifrost-worker-{}", args.worker_id);
    let mut consumer = broker::consume(&amqp_pool, &consumer_tag)
        .await
        .context("failed to start consuming from the broker")?;

    info!(worker_id = args.worker_id, "bifrost-worker ready, consuming dispatch messages");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!(error = %e, "broker delivery error");
                continue;
            }
        };

        let message: DispatchMessage = match serde_json::from_slice(&delivery.data) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "malformed dispatch message, dropping");
                let _ = broker::ack(&delivery).await;
                continue;
            }
        };

        let execution_id = message.execution_id;
        match handle_dispatch(&ctx, &message).await {
            Ok(true) => {
                if let Err(e) = broker::ack(&delivery).await {
                    warn!(%execution_id, error = %e, "failed to ack delivery");
                }
            }
            Ok(false) => {
                if let Err(e) = broker::nack_requeue(&delivery).await {
                    warn!(%execution_id, error = %e, "failed to nack delivery");
                }
            }
            Err(e) => {
                error!(%execution_id, error = %e, "dispatch handling failed, requeueing");
                if let Err(e) = broker::nack_requeue(&delivery).await {
                    warn!(%execution_id, error = %e, "failed to nack delivery");
                }
            }
        }
    }

    Ok(())
}

fn spawn_heartbeat_loop(worker_state: Arc<RedisWorkerState>, worker_id: u32) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = worker_state.heartbeat(worker_id).await {
                warn!(worker_id, error = %e, "failed to refresh heartbeat");
            }
        }
    });
}
