use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardscan::api::{create_router, AppState};
use cardscan::auth::SessionVerifier;
use cardscan::config::Config;
use cardscan::ocr::OcrProvider;

#[derive(Parser)]
#[command(name = "cardscan")]
#[command(about = "Insurance-card OCR service")]
struct Args {
    /// Override CARDSCAN_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override CARDSCAN_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardscan=info,tower_http=debug".into()),
        )
        .with(args.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing OCR provider...");
    let ocr = OcrProvider::new(&config.ocr);

    let sessions = SessionVerifier::new(&config.auth);
    if !sessions.is_enabled() {
        tracing::warn!(
            "No AUTH_JWT_PUBLIC_KEY or AUTH_JWT_SECRET; protected pages will always redirect to sign-in"
        );
    }

    tracing::info!(
        locales = ?config.locale.locales,
        default = %config.locale.default_locale,
        prefix = ?config.locale.prefix,
        "Locale routing configured"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_name = config.app_name.clone();
    let state = AppState::new(config, ocr, sessions);
    let app = create_router(state);

    tracing::info!("{} starting on http://{}", app_name, addr);
    tracing::info!("  OCR endpoint: http://{}/api/ocr", addr);
    tracing::info!("  API docs:     http://{}/api/docs", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    tracing::info!("Shutdown signal received, draining connections...");
}
