use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use dispatch_api::{build_router, config, db, events, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app_config = config::load_config()?;
    config::init_tracing(&app_config.log_level);

    info!("dispatch-api starting...");

    let pool = db::establish_connection(&app_config.database_url).await?;
    if app_config.auto_migrate {
        info!("running database migrations");
        db::run_migrations(&pool).await?;
    }
    let pool = Arc::new(pool);

    let (event_tx, event_rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(events::process_events(event_rx));
    let event_sender = events::EventSender::new(event_tx);

    let state = Arc::new(AppState::new(pool, app_config.clone(), event_sender));
    let app = build_router(state);

    let addr = SocketAddr::new(app_config.host.parse()?, app_config.port);
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
