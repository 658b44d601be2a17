use std::sync::Arc;

use tracing::{error, info};

use storefront_api::{
    build_router,
    config::{init_tracing, load_config},
    db::{establish_connection_from_app_config, run_migrations},
    events, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "starting storefront-api"
    );

    let db = Arc::new(establish_connection_from_app_config(&config).await?);
    if config.auto_migrate {
        run_migrations(&db).await?;
        info!("database migrations applied");
    }

    let (event_sender, event_receiver) = events::channel(1024);
    tokio::spawn(events::process_events(event_receiver));

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(db, config, event_sender));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(%err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
