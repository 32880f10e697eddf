use std::net::SocketAddr;

use tracing::{Level, info};

use tally_server::config::AppConfig;
use tally_server::database::init_db;
use tally_server::seed::ensure_indexes;
use tally_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let db = init_db(&config.database.url).await?;
    ensure_indexes(&db).await?;

    let app = tally_server::build_router(AppState { db, config });

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
