use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use story_proxy::{
    config::Config,
    api::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,story_proxy=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let app_state = AppState::from_config(&config);
    tracing::info!(
        provider = %app_state.providers.current(),
        openai = config.openai.is_some(),
        gemini = config.gemini.is_some(),
        copyleaks = config.copyleaks.is_some(),
        "Providers configured"
    );
    if let Some(ttl) = config.correlation_ttl {
        tracing::info!(ttl_secs = ttl.as_secs(), "Correlation records expire");
    }

    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
