use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pollbox::config::Config;
use pollbox::{db, routes, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let pool = db::create_pool(&config)
        .await
        .expect("Failed to connect to the database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let app = routes::api_router(AppState::new(pool));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server running on {addr}");
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .expect("Server failed");
}
