// src/services/geocode.rs

use crate::{
    errors::{AppError, AppResult},
    models::GpsFix,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(3);

/// Reverse geocoding. Addresses are a courtesy; callers must treat any error
/// as "no address" and carry on.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, fix: GpsFix) -> AppResult<Option<String>>;
}

/// Used when no geocoder is configured.
pub struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn reverse(&self, _fix: GpsFix) -> AppResult<Option<String>> {
        Ok(None)
    }
}

// ─── Nominatim ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(GEOCODE_TIMEOUT)
            .user_agent(concat!("hrms-kernel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Cannot build geocoder client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, fix: GpsFix) -> AppResult<Option<String>> {
        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", fix.latitude.to_string()),
                ("lon", fix.longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::External(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::External(e.to_string()))?;

        let body: ReverseResponse = resp
            .json()
            .await
            .map_err(|e| AppError::External(e.to_string()))?;

        if let Some(message) = body.error {
            return Err(AppError::External(message));
        }
        Ok(body.display_name.filter(|name| !name.trim().is_empty()))
    }
}
