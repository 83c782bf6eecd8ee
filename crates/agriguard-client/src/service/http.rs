// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP auth service.

use agriguard_config::ApiConfig;
use agriguard_core::{AuthError, AuthResult, Claims, Credential, Role, Session, User, UserId, ZoneId};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{AuthService, LoginRequest};

// =============================================================================
// Wire Types
// =============================================================================

/// Issuance response. Accepts both `credential` and the backend's
/// `access_token`.
#[derive(Debug, Deserialize)]
struct IssueResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    credential: String,
    #[serde(default)]
    user: Option<WireUser>,
}

/// User as returned by the backend.
///
/// The backend sends `first_name`/`last_name` and snake_case roles; other
/// deployments send a single `name`.
#[derive(Debug, Deserialize)]
struct WireUser {
    id: UserId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "firstName")]
    first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    role: Role,
    #[serde(default, alias = "zoneId")]
    zone_id: Option<ZoneId>,
}

impl WireUser {
    fn into_user(self, claims: &Claims) -> User {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let email = self
            .email
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| claims.email.clone());

        let name = self
            .name
            .filter(|name| !name.is_empty())
            .or_else(|| (!joined.is_empty()).then_some(joined))
            .or_else(|| claims.name.clone())
            .unwrap_or_else(|| email.clone());

        User {
            id: self.id,
            name,
            email,
            role: self.role,
            zone_id: self.zone_id.or_else(|| claims.zone_id.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "msg")]
    message: String,
}

// =============================================================================
// HttpAuthService
// =============================================================================

/// Auth service backed by the dashboard's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpAuthService {
    client: reqwest::Client,
    login_url: String,
    refresh_url: String,
}

impl HttpAuthService {
    /// Creates a service from the API configuration.
    pub fn new(config: &ApiConfig) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| AuthError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config))
    }

    /// Creates a service around an existing client.
    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self {
            client,
            login_url: config.url(&config.login_path),
            refresh_url: config.url(&config.refresh_path),
        }
    }

    /// Returns the issuance URL.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Builds the issuance request body.
    fn login_body(request: &LoginRequest) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(
            request.identifier.field_name().to_string(),
            serde_json::Value::String(request.identifier.as_str().to_string()),
        );
        body.insert(
            "password".to_string(),
            serde_json::Value::String(request.secret().to_string()),
        );
        serde_json::Value::Object(body)
    }

    async fn read_session(response: reqwest::Response, fallback: Option<&User>) -> AuthResult<Session> {
        let body: IssueResponse = response
            .json()
            .await
            .map_err(|e| AuthError::invalid_payload(format!("unexpected auth response: {}", e)))?;

        let credential = Credential::parse(body.credential)?;
        let user = match (body.user, fallback) {
            (Some(wire), _) => wire.into_user(credential.claims()),
            (None, Some(user)) => user.clone(),
            (None, None) => return Err(AuthError::invalid_payload("auth response carries no user")),
        };

        Session::new(credential, user)
    }

    async fn upstream_error(response: reqwest::Response) -> AuthError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        AuthError::upstream(status.as_u16(), message)
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn issue(&self, request: &LoginRequest) -> AuthResult<Session> {
        debug!(url = %self.login_url, field = request.identifier.field_name(), "Requesting credential");

        let response = self
            .client
            .post(&self.login_url)
            .json(&Self::login_body(request))
            .send()
            .await
            .map_err(|e| AuthError::network(format!("auth request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => Self::read_session(response, None).await,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            _ => Err(Self::upstream_error(response).await),
        }
    }

    async fn refresh(&self, session: &Session) -> AuthResult<Session> {
        debug!(url = %self.refresh_url, user_id = %session.user().id, "Refreshing credential");

        let response = self
            .client
            .post(&self.refresh_url)
            .header(reqwest::header::AUTHORIZATION, session.credential().bearer_header())
            .send()
            .await
            .map_err(|e| AuthError::network(format!("refresh request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => Self::read_session(response, Some(session.user())).await,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::AuthenticationRequired),
            _ => Err(Self::upstream_error(response).await),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

// =============================================================================
// Tests
// =============================================================================
