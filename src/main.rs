use itinerary::config::AppConfig;
use itinerary::error::AppError;
use itinerary::routes::create_router;
use itinerary::services::storage::FileStore;
use itinerary::state::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    FileStore::new(config.data_dir.clone()).ensure_structure()?;
    std::fs::create_dir_all(&config.export_dir)?;
    info!(
        data_dir = %config.data_dir.display(),
        display_tz = config.zones.display.name(),
        "starting itinerary"
    );

    let state = AppState::from_config(config.clone());
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,itinerary=debug,tower_http=info".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
