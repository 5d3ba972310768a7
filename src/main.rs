use std::sync::Arc;

use clap::Parser;
use dshelper::aggregate::Aggregator;
use dshelper::auth::Credentials;
use dshelper::config::{Cli, Config, default_config_path};
use dshelper::extensions::ExtensionRegistry;
use dshelper::handler::{AppState, app};
use dshelper::jobs::JobRegistry;
use dshelper::library::{DiskLibraryAccessor, LibraryCatalog};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("dshelper.svc starting");

    let config_path = args
        .config_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_config_path);

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    let credentials = Credentials::new(cfg.app.users.clone());
    if !credentials.is_enabled() {
        tracing::warn!("no users configured, dshelper endpoints are open to everyone");
    }

    let registry = Arc::new(ExtensionRegistry::discover(&cfg));
    let libraries = Arc::new(LibraryCatalog::new(
        Arc::new(DiskLibraryAccessor),
        cfg.calibre.gui_prefs_path(),
        cfg.calibre.libraries.clone(),
    ));

    let state = AppState {
        // populated by the host job runner, see `jobs`
        jobs: Arc::new(JobRegistry::new()),
        aggregator: Arc::new(Aggregator::new(registry, libraries)),
        credentials,
    };

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("dshelper.svc running on {}", &address);
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
        }
        tracing::info!("ctrl+c signal received, preparing to shutdown");
    };

    if let Err(err) = axum::serve(listener, app(state)).with_graceful_shutdown(shutdown).await {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }

    tracing::info!("dshelper.svc going off, graceful shutdown complete");
}
