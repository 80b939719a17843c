use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_backend::api::router;
use campus_backend::push::{HttpPushClient, NoopPushClient, PushClient, PushConfig};
use campus_backend::services::VacancySweeper;
use campus_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "campus_backend=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://campus.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let push: Arc<dyn PushClient> = match PushConfig::new_from_env() {
        Ok(config) => Arc::new(HttpPushClient::new(config)?),
        Err(_) => {
            warn!("PUSH_API_KEY not set, push notifications disabled");
            Arc::new(NoopPushClient)
        }
    };

    let sweep_interval = std::env::var("VACANCY_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    tokio::spawn(VacancySweeper::new(pool.clone(), sweep_interval).start());

    let state = AppState {
        db: pool.clone(),
        push,
    };

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
