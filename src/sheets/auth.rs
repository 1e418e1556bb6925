//! Service-account OAuth: sign a JWT assertion and trade it for a bearer token.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::config::ServiceAccount;
use crate::error::{AppError, AppResult};

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

const ASSERTION_LIFETIME_SECS: i64 = 3600;
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub fn claims_for(account: &ServiceAccount, now: i64) -> Claims {
    Claims {
        iss: account.client_email.clone(),
        scope: SCOPES.join(" "),
        aud: account.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

/// RS256-signed assertion for the token endpoint.
pub fn signed_assertion(account: &ServiceAccount) -> AppResult<String> {
    let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
        .map_err(|e| AppError::Credentials(format!("private_key is not a valid RSA PEM key: {}", e)))?;
    let claims = claims_for(account, Utc::now().timestamp());
    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| AppError::Auth(format!("failed to sign JWT assertion: {}", e)))
}

pub fn fetch_access_token(
    http: &reqwest::blocking::Client,
    account: &ServiceAccount,
) -> AppResult<String> {
    let assertion = signed_assertion(account)?;
    tracing::debug!("requesting access token from {}", account.token_uri);

    let response = http
        .post(&account.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::error!("token request failed: {}", body);
        return Err(AppError::Auth(format!("token endpoint returned {}: {}", status, body)));
    }

    let token: TokenResponse = response
        .json()
        .map_err(|e| AppError::Auth(format!("unreadable token response: {}", e)))?;
    tracing::debug!("access token valid for {:?}s", token.expires_in);
    Ok(token.access_token)
}
