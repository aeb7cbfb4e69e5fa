//! ==============================================================================
//! main.rs - greenhouse relay entry point
//! ==============================================================================
//!
//! purpose:
//!     the backend half of the greenhouse controller app. it shuttles data
//!     between cloud firestore (what the app edits) and the realtime database
//!     (what the controller boards read), and relays push notifications.
//!
//! responsibilities:
//!     - load configuration (config.rs) and start structured logging
//!     - build the authenticated platform handle once (platform/)
//!     - serve the sync + notification endpoints and the static client bundle
//!     - shut down gracefully on ctrl+c / sigterm
//!
//! architecture:
//!
//!     ┌──────────────┐   POST /sync/*, /sendNotification   ┌──────────────┐
//!     │  client app  │ ──────────────────────────────────▶ │ routes.rs    │
//!     │  / scheduler │                                      └──────┬───────┘
//!     └──────────────┘                                             │
//!                                     ┌────────────────────────────┼───────────────┐
//!                                     ▼                            ▼               ▼
//!                               ┌───────────┐              ┌────────────┐    ┌──────────┐
//!                               │ sync.rs   │              │ notify.rs  │    │ static   │
//!                               └─────┬─────┘              └─────┬──────┘    │ bundle   │
//!                                     │  Platform (shared handle)│           └──────────┘
//!                     ┌───────────────┼──────────────────────────┤
//!                     ▼               ▼                          ▼
//!              ┌────────────┐  ┌──────────────┐           ┌────────────┐
//!              │ firestore  │  │ realtime db  │           │    fcm     │
//!              └────────────┘  └──────────────┘           └────────────┘
//!
//! ==============================================================================

mod config;
mod domain;
mod error;
mod notify;
mod platform;
mod routes;
mod sync;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (config, origin) = config::RelayConfig::load_or_default()?;

    // step 2: logging (RUST_LOG wins over the configured level)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
    config.log_summary(&origin);

    // step 3: the one authenticated platform handle, shared by every handler
    let platform = platform::Platform::from_config(&config.firebase)
        .context("failed to initialise firebase platform clients")?;

    // step 4: serve
    let app = routes::router(platform, &config.server.static_dir);

    let address = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("relay listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("relay shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received ctrl+c, shutting down"),
            Err(e) => {
                error!("failed to install ctrl+c handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!("failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
