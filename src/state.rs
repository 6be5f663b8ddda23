// src/state.rs

use crate::{
    config::Config,
    errors::AppResult,
    repository::PgStore,
    services::{
        attendance::AttendanceService,
        face_check::FaceDetector,
        geocode::{Geocoder, NoGeocoder, NominatimGeocoder},
    },
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PgStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: PgStore, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    /// Opens the pool and applies pending migrations.
    pub async fn connect(config: Config) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database connected and migrations applied");

        Ok(Self::new(PgStore::new(pool), config))
    }

    pub fn geocoder(&self) -> AppResult<Arc<dyn Geocoder>> {
        Ok(match &self.config.geocoder_url {
            Some(url) => Arc::new(NominatimGeocoder::new(url.clone())?),
            None => Arc::new(NoGeocoder),
        })
    }

    pub fn attendance(&self, detector: Arc<dyn FaceDetector>) -> AppResult<AttendanceService> {
        Ok(AttendanceService::new(
            self.store.clone(),
            detector,
            self.geocoder()?,
            self.config.attendance.clone(),
        ))
    }
}
