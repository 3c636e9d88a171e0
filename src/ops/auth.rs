//! Access tokens for the Google APIs and for Zoom.
//!
//! Both are fetched once per run and used for the lifetime of the process.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::ops::config_reader::ZoomKey;
use crate::ops::{
    OpeningConfigSnafu, OpsResult, ParsingKeySnafu, SigningTokenSnafu, TokenRejectedSnafu,
    TokenRequestSnafu,
};

pub const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

pub const ZOOM_TOKEN_URL: &str = "https://zoom.us/oauth/token";

/// The fields of a service account key file that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Eq, PartialEq, Debug, Serialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub fn read_service_account_key(path: &Path) -> OpsResult<ServiceAccountKey> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path: &path_s })?;
    serde_json::from_str(&contents).context(ParsingKeySnafu { path: path_s })
}

pub fn claims(key: &ServiceAccountKey, now: i64) -> Claims {
    Claims {
        iss: key.client_email.clone(),
        scope: GOOGLE_SCOPES.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

fn exchange(request: RequestBuilder, url: &str) -> OpsResult<String> {
    let response = request.send().context(TokenRequestSnafu { url })?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return TokenRejectedSnafu {
            url,
            status: status.as_u16(),
            body,
        }
        .fail();
    }
    let token: TokenResponse = response.json().context(TokenRequestSnafu { url })?;
    Ok(token.access_token)
}

/// Signs an RS256 assertion with the service account key and trades it for
/// a bearer token covering the spreadsheets and the files.
pub fn google_access_token(http: &Client, key_path: &Path) -> OpsResult<String> {
    let key = read_service_account_key(key_path)?;
    let claims = claims(&key, Utc::now().timestamp());
    let signing_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).context(SigningTokenSnafu)?;
    let assertion =
        encode(&Header::new(Algorithm::RS256), &claims, &signing_key).context(SigningTokenSnafu)?;
    debug!("google_access_token: exchanging assertion for {}", key.client_email);
    let request = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);
    let token = exchange(request, &key.token_uri)?;
    info!("google_access_token: authorized as {}", key.client_email);
    Ok(token)
}

/// `Basic` credentials of the server-to-server app.
pub fn zoom_basic_auth(key: &ZoomKey) -> String {
    let raw = format!("{}:{}", key.client_id, key.client_secret);
    format!("Basic {}", STANDARD.encode(raw))
}

pub fn zoom_access_token(http: &Client, key: &ZoomKey) -> OpsResult<String> {
    let request = http
        .post(ZOOM_TOKEN_URL)
        .query(&[
            ("grant_type", "account_credentials"),
            ("account_id", key.account_id.as_str()),
        ])
        .header(reqwest::header::AUTHORIZATION, zoom_basic_auth(key));
    let token = exchange(request, ZOOM_TOKEN_URL)?;
    info!("zoom_access_token: authorized account {}", key.account_id);
    Ok(token)
}
