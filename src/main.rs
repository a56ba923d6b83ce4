use primepath_backend::{
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }

    info!(
        case_sensitive = config.scoring.case_sensitive,
        partial_credit = config.scoring.partial_credit,
        mixed_weighting = ?config.scoring.mixed_weighting,
        "Scoring policy loaded"
    );

    let pool = create_pool().await?;
    run_migrations(&pool).await?;
    info!("Migrations applied");

    let app = routes::create_router(AppState::new(pool));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
