pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repo;
pub mod results;
pub mod routes;
pub mod voting;

use sqlx::PgPool;

use repo::PgPollStore;

#[derive(Clone)]
pub struct AppState {
    pub store: PgPollStore,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: PgPollStore::new(pool),
        }
    }
}
