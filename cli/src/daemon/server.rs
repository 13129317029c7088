// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Daemon composition root: wires every Execution Orchestration Core
//! component (C1-C11) against Postgres/Redis/AMQP and serves the HTTP
//! surface. `bifrost-worker` processes are spawned as subprocesses but
//! self-consume from the broker independently (`bin/worker.rs`); this
//! process never dispatches work to them directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use bifrost_orchestrator_core::application::admission::{AdmissionGate, BrokerProducer, StandardAdmissionGate};
use bifrost_orchestrator_core::application::pool_manager::WorkerPoolManager;
use bifrost_orchestrator_core::application::scheduler::Scheduler;
use bifrost_orchestrator_core::application::stuck_monitor::{StuckExecutionMonitor, DEFAULT_STUCK_GRACE_SECONDS};
use bifrost_orchestrator_core::application::webhook_dispatcher::{AdapterRegistry, WebhookDispatcher};
use bifrost_orchestrator_core::domain::event::WebhookAdapter;
use bifrost_orchestrator_core::domain::repository::{
    AccessRepository, EventRepository, ExecutionLogRepository, ExecutionRepository, SystemConfigRepository,
    WorkerHeartbeatSource, WorkflowRepository,
};
use bifrost_orchestrator_core::domain::worker_pool::PoolPolicy;
use bifrost_orchestrator_core::infrastructure::broker::{self, AmqpBroker};
use bifrost_orchestrator_core::infrastructure::db::Database;
use bifrost_orchestrator_core::infrastructure::memory_monitor::ProcMeminfoMonitor;
use bifrost_orchestrator_core::infrastructure::process_runtime::ProcessWorkerRuntime;
use bifrost_orchestrator_core::infrastructure::redis_pubsub::RedisUpdateChannel;
use bifrost_orchestrator_core::infrastructure::redis_queue::RedisQueueTracker;
use bifrost_orchestrator_core::infrastructure::redis_store::RedisPendingStore;
use bifrost_orchestrator_core::infrastructure::redis_worker_state::RedisWorkerState;
use bifrost_orchestrator_core::infrastructure::repositories::{
    postgres_access::PostgresAccessRepository, postgres_config::PostgresSystemConfigRepository,
    postgres_event::PostgresEventRepository, postgres_execution::PostgresExecutionRepository,
    postgres_execution_log::PostgresExecutionLogRepository, postgres_subscription::PostgresSubscriptionResolver,
    postgres_workflow::PostgresWorkflowRepository,
};
use bifrost_orchestrator_core::infrastructure::webhook_adapters::GenericHmacAdapter;
use bifrost_orchestrator_core::presentation::api::{app, AppState};

use crate::config::BifrostConfig;

use super::{remove_pid_file, write_pid_file};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../core/migrations");

const SCHEDULER_TICK: Duration = Duration::from_secs(30);
const STUCK_MONITOR_TICK: Duration = Duration::from_secs(30);
const POOL_AUTOSCALE_TICK: Duration = Duration::from_secs(10);
const SYNC_RESULT_TTL_SECONDS: u64 = 120;

pub async fn start_daemon(config_path: Option<PathBuf>, host: String, port: u16) -> Result<()> {
    let pid = std::process::id();
    write_pid_file(pid)?;
    let _guard = PidFileGuard;

    info!(pid, "Bifrost daemon starting");

    let config = BifrostConfig::load(config_path).context("failed to load configuration")?;
    config.validate().context("configuration validation failed")?;

    let database = Database::new(&config.database_url).await.context("failed to connect to Postgres")?;
    let pool = database.get_pool().clone();

    info!("applying pending database migrations");
    MIGRATOR.run(&pool).await.context("failed to apply database migrations")?;

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
    let event_repository: Arc<dyn EventRepository> = Arc::new(PostgresEventRepository::new(pool.clone()));
    let config_repository: Arc<dyn SystemConfigRepository> = Arc::new(PostgresSystemConfigRepository::new(pool.clone()));
    let subscription_resolver = Arc::new(PostgresSubscriptionResolver::new(pool.clone()));

    let update_channel = Arc::new(RedisUpdateChannel::new(redis_conn.clone()));

    let pending_store = Arc::new(RedisPendingStore::new(redis_conn.clone()));
    let queue_tracker = Arc::new(RedisQueueTracker::new(redis_conn.clone(), update_channel));
    let worker_state = Arc::new(RedisWorkerState::new(redis_conn.clone()));

    let broker_producer: Arc<dyn BrokerProducer> = Arc::new(AmqpBroker::new(amqp_pool));

    let admission_gate: Arc<dyn AdmissionGate> = Arc::new(StandardAdmissionGate::new(
        workflow_repository.clone(),
        access_repository,
        execution_repository.clone(),
        pending_store,
        queue_tracker.clone(),
        broker_producer,
    ));

    let mut adapters = AdapterRegistry::new();
    let generic_adapter: Arc<dyn WebhookAdapter> = Arc::new(GenericHmacAdapter);
    adapters.register(generic_adapter);
    let webhook_dispatcher = Arc::new(WebhookDispatcher::new(
        adapters,
        config_repository.clone(),
        event_repository,
        subscription_resolver,
        admission_gate.clone(),
    ));

    let worker_runtime = Arc::new(ProcessWorkerRuntime::new(config.worker_binary.clone(), Vec::new()));
    let memory_monitor = Arc::new(ProcMeminfoMonitor::new());
    let default_policy = PoolPolicy::validated(
        config.worker_pool.min_workers,
        config.worker_pool.max_workers,
        config.worker_pool.worker_memory_threshold_mb,
    )
    .context("invalid worker_pool settings")?;
    let pool_manager = Arc::new(WorkerPoolManager::new(worker_runtime, memory_monitor, config_repository, default_policy));
    pool_manager.load_persisted_policy().await.context("failed to load persisted worker pool policy")?;
    pool_manager.ensure_minimum().await.context("failed to spawn minimum worker pool")?;

    let scheduler = Arc::new(Scheduler::new(workflow_repository, admission_gate.clone()));
    let stuck_monitor = Arc::new(StuckExecutionMonitor::new(
        execution_repository.clone(),
        worker_state as Arc<dyn WorkerHeartbeatSource>,
        DEFAULT_STUCK_GRACE_SECONDS,
    ));

    spawn_scheduler_loop(scheduler);
    spawn_stuck_monitor_loop(stuck_monitor);
    spawn_autoscale_loop(pool_manager.clone(), queue_tracker.clone());

    let state = Arc::new(AppState {
        admission_gate,
        execution_repository,
        log_repository,
        queue_tracker,
        pool_manager,
        webhook_dispatcher,
        redis_client,
        sync_result_ttl_seconds: SYNC_RESULT_TTL_SECONDS,
    });

    let router = app(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind to {addr}"))?;
    info!(%addr, "Bifrost daemon listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await.context("HTTP server failed")?;

    info!("Bifrost daemon shutting down");
    Ok(())
}

fn spawn_scheduler_loop(scheduler: Arc<Scheduler>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCHEDULER_TICK);
        loop {
            interval.tick().await;
            if let Err(e) = scheduler.tick().await {
                warn!(error = %e, "scheduler tick failed");
            }
        }
    });
}

fn spawn_stuck_monitor_loop(monitor: Arc<StuckExecutionMonitor>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STUCK_MONITOR_TICK);
        loop {
            interval.tick().await;
            if let Err(e) = monitor.tick().await {
                warn!(error = %e, "stuck execution monitor tick failed");
            }
        }
    });
}

fn spawn_autoscale_loop(pool_manager: Arc<WorkerPoolManager>, queue_tracker: Arc<RedisQueueTracker>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POOL_AUTOSCALE_TICK);
        loop {
            interval.tick().await;
            match queue_tracker.depth().await {
                Ok(depth) => {
                    if let Err(e) = pool_manager.maybe_scale_up(depth).await {
                        warn!(error = %e, "worker pool autoscale tick failed");
                    }
                }
                Err(e) => warn!(error = %e, "failed to read queue depth for autoscale tick"),
            }
        }
    });
}

struct PidFileGuard;

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = remove_pid_file();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
