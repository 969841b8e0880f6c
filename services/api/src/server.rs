use crate::cli::ServeArgs;
use crate::infra::{AppState, Marketplace};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dirt_marketplace::config::AppConfig;
use dirt_marketplace::error::AppError;
use dirt_marketplace::geo::ConfiguredGeocoder;
use dirt_marketplace::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let geocoder = ConfiguredGeocoder::from_config(&config.geocoder)?;
    if matches!(geocoder, ConfiguredGeocoder::Static(_)) {
        warn!("MAPBOX_ACCESS_TOKEN not set; using the built-in zip code table");
    }
    let provider = geocoder.provider();
    let marketplace = Marketplace::in_memory(geocoder, config.sessions.ttl()?);

    let app = with_marketplace_routes(&marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, geocoder = provider, "dirt marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
