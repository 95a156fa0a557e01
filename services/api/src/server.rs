use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryTaskStore};
use crate::routes::with_provisioning_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use provision_advisor::auth::Authenticator;
use provision_advisor::config::AppConfig;
use provision_advisor::error::AppError;
use provision_advisor::telemetry;
use provision_advisor::workflows::provisioning::{
    task_channel, ProvisioningRequestService, SimulatedProvisioning, WorkerPool,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(workers) = args.workers.take() {
        config.worker.concurrency = workers.get();
    }
    if let Some(secs) = args.provisioning_secs.take() {
        config.worker.provisioning_duration = Duration::from_secs(secs);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryTaskStore::default());
    let (queue, deliveries) = task_channel();
    let strategy = Arc::new(SimulatedProvisioning::new(
        config.worker.provisioning_duration,
    ));
    let pool = WorkerPool::spawn(
        config.worker.concurrency,
        deliveries,
        store.clone(),
        strategy,
    );

    let service = Arc::new(ProvisioningRequestService::new(store, Arc::new(queue)));
    let authenticator = Arc::new(Authenticator::from_config(&config.auth));

    let app = with_provisioning_routes(service, authenticator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        workers = pool.worker_count(),
        provisioning_secs = config.worker.provisioning_duration.as_secs(),
        "provision advisor ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await;

    pool.shutdown_and_join().await;
    served?;
    Ok(())
}

async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }

    readiness.store(false, Ordering::Release);
    info!("shutdown requested, draining connections");
}
