use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    utils::{email::Mailer, maps::MapsClient},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub maps: MapsClient,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let http = reqwest::Client::new();
        Self {
            maps: MapsClient::new(http.clone(), config.maps.clone()),
            mailer: Mailer::new(config.email.clone()),
            config: Arc::new(config),
            http,
            db,
        }
    }
}
