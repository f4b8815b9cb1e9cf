use castor::config::Config;
use castor::server::router::{CastorState, castor_router};
use castor::upstream::{HttpCompletionClient, ResilientInvoker, build_http_client};
use castor::utils::logging::mask_secret;
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let policy = cfg.retry_policy()?;
    let credential = cfg.upstream.credential();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        loglevel = %cfg.basic.loglevel,
        static_dir = %cfg.basic.static_dir.display(),
        "Server config loaded"
    );
    info!(
        base_url = %cfg.upstream.base_url,
        model = %cfg.upstream.model,
        api_key = %mask_secret(credential),
        proxy = %cfg.upstream.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        enable_multiplexing = cfg.upstream.enable_multiplexing,
        "Upstream config (effective)"
    );
    info!(
        max_attempts = policy.max_attempts(),
        initial_delay = ?policy.initial_delay(),
        backoff_multiplier = policy.backoff_multiplier(),
        worst_case_delay = ?policy.worst_case_delay(),
        "Retry policy"
    );
    if credential.is_none() {
        warn!("No upstream API key configured; chat requests will fail until SAMBANOVA_API_KEY is set");
    }

    let http = build_http_client(&cfg.upstream)?;
    let client = HttpCompletionClient::new(&cfg.upstream, http)?;
    let credential_configured = client.has_credential();
    let invoker = ResilientInvoker::new(Arc::new(client), policy, credential_configured);

    let state = CastorState::new(invoker, cfg.basic.static_dir.clone());
    let app = castor_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
