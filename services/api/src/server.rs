use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_wizard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use screening_wizard::config::AppConfig;
use screening_wizard::error::AppError;
use screening_wizard::telemetry;
use screening_wizard::wizard::{StepDispatcher, WizardMount};
use screening_wizard::workflows::record_a_mammogram;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let wizard = Arc::new(record_a_mammogram::wizard()?);
    info!(
        start_step = wizard.start_step().id(),
        steps = wizard.len(),
        "screening wizard loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let mount = WizardMount::new(
        record_a_mammogram::NAMESPACE,
        config.wizard.prefix.clone(),
        Arc::new(StepDispatcher::new(wizard)),
    );

    let app = with_wizard_routes(mount)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, prefix = %config.wizard.prefix, "screening wizard ready");

    axum::serve(listener, app).await?;
    Ok(())
}
