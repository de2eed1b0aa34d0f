mod api;
mod config;
mod errors;
mod middleware;
mod models;
mod router;
mod utils;

use shuttle_axum::ShuttleAxum;
use shuttle_runtime::SecretStore;
use sqlx::postgres::PgPoolOptions;

use crate::{config::Config, models::app_state::AppState, router::create_app};

#[shuttle_runtime::main]
async fn main(
    #[shuttle_shared_db::Postgres] conn_str: String,
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> ShuttleAxum {
    let config = Config::from_secrets(&secrets)
        .map_err(|e| shuttle_runtime::CustomError::msg(format!("Invalid configuration: {:?}", e)))?;

    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await
        .map_err(shuttle_runtime::CustomError::new)?;

    sqlx::migrate!()
        .run(&db)
        .await
        .map_err(shuttle_runtime::CustomError::new)?;

    tracing::info!("Database ready, migrations applied");

    let state = AppState::new(db, config);

    Ok(create_app(state).into())
}
