use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use crate::sheets::client::AUTH_SCOPE;
use hyper_util::client::legacy::connect::HttpConnector;
use tracing::debug;
use yup_oauth2::{
    ServiceAccountAuthenticator, authenticator::Authenticator, hyper_rustls::HttpsConnector,
};

pub(super) type AuthType = Authenticator<HttpsConnector<HttpConnector>>;

/// Create and verify a service-account authenticator by fetching a token
pub(super) async fn create_and_verify_authenticator(config: &GoogleConfig) -> Result<AuthType> {
    let auth = from_service_account(config).await?;

    // Trigger authentication by requesting a token
    let _token = auth
        .token(&[AUTH_SCOPE])
        .await
        .map_err(|e| AppError::Auth(format!("Failed to get token: {}", e)))?;
    debug!("Service account token acquired");

    Ok(auth)
}

async fn from_service_account(config: &GoogleConfig) -> Result<AuthType> {
    let key = yup_oauth2::read_service_account_key(&config.credentials_path)
        .await
        .map_err(|e| {
            AppError::Auth(format!(
                "Failed to read service account key {}: {}",
                config.credentials_path.display(),
                e
            ))
        })?;

    let auth = ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|e| AppError::Auth(format!("Failed to build authenticator: {}", e)))?;

    Ok(auth)
}
