//! Theme API request
//! Fetches `theme.json` for one shop with the configured bearer token

use log::info;
use reqwest::{Client, StatusCode};

use crate::domain::theme_sync::{
    custom_errors::SyncError,
    value_objects::{credentials::Credentials, theme_bundle::ThemeBundle},
};

#[derive(Debug, Clone)]
pub struct ThemeRequest {
    http_client: Client,
}

impl ThemeRequest {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    pub async fn get(&self, shop_id: &str, credentials: &Credentials) -> Result<ThemeBundle, SyncError> {
        let url = credentials.theme_endpoint(shop_id);
        info!("getting {}", url);

        let resp = self
            .http_client
            .get(url)
            .bearer_auth(credentials.access_token())
            .send()
            .await?;
        info!("status {}", resp.status());
        check_status(resp.status())?;

        let bundle: ThemeBundle = resp.json().await?;
        Ok(bundle)
    }
}

/// Status is checked before the body is decoded; error pages are not themes
pub(crate) fn check_status(status: StatusCode) -> Result<(), SyncError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(SyncError::TokenRejected),
        StatusCode::FORBIDDEN => Err(SyncError::AccessDenied),
        s if s.is_success() => Ok(()),
        s => Err(SyncError::UnexpectedStatus(s.as_u16())),
    }
}
