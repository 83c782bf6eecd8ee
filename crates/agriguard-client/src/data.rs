// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Auth-aware data client.
//!
//! Every resource operation re-checks the current user, role and zone before
//! the transport is touched. A page rendered by mistake still cannot read or
//! write data it is not entitled to.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agriguard_config::ApiConfig;
use agriguard_core::{AuthError, AuthResult, PermissionEngine, PermissionKey, ZoneId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::session::SessionManager;

// =============================================================================
// Resource Model
// =============================================================================

/// Resource classes served by the dashboard API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Agricultural zones.
    Zones,
    /// IoT devices.
    Iot,
    /// Farmers.
    Farmers,
    /// Crop recommendations.
    Recommendations,
    /// Sensor data of a zone.
    ZoneData,
    /// Dashboard users.
    Users,
}

impl ResourceKind {
    /// All resource kinds.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Zones,
        ResourceKind::Iot,
        ResourceKind::Farmers,
        ResourceKind::Recommendations,
        ResourceKind::ZoneData,
        ResourceKind::Users,
    ];

    /// Returns the resource name used in permission keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Zones => "zones",
            ResourceKind::Iot => "iot",
            ResourceKind::Farmers => "farmers",
            ResourceKind::Recommendations => "recommendations",
            ResourceKind::ZoneData => "zone_data",
            ResourceKind::Users => "users",
        }
    }

    /// Returns the collection path.
    ///
    /// Zone data is nested under its zone.
    ///
    /// # Errors
    ///
    /// [`AuthError::Internal`] if the zone id is not a single path segment.
    pub fn collection_path(&self, zone: Option<&ZoneId>) -> AuthResult<String> {
        let path = match (self, zone) {
            (ResourceKind::Zones, _) => "/api/zones".to_string(),
            (ResourceKind::Iot, _) => "/api/iots".to_string(),
            (ResourceKind::Farmers, _) => "/api/farmers".to_string(),
            (ResourceKind::Recommendations, _) => "/api/recommendations".to_string(),
            (ResourceKind::ZoneData, Some(zone)) => {
                format!("/api/zones/{}/data", path_segment(zone.as_str(), "zone id")?)
            }
            (ResourceKind::ZoneData, None) => "/api/data".to_string(),
            (ResourceKind::Users, _) => "/api/users".to_string(),
        };
        Ok(path)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operations on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// List the collection.
    List,
    /// Read one item.
    Get,
    /// Create an item.
    Create,
    /// Replace an item.
    Update,
    /// Delete an item.
    Delete,
    /// Approve an item.
    Approve,
}

impl Operation {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Approve => "approve",
        }
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> Method {
        match self {
            Operation::List | Operation::Get => Method::Get,
            Operation::Create | Operation::Approve => Method::Post,
            Operation::Update => Method::Put,
            Operation::Delete => Method::Delete,
        }
    }

    /// Returns `true` if the operation addresses a single item.
    pub fn needs_id(&self) -> bool {
        !matches!(self, Operation::List | Operation::Create)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a resource operation to the permission it requires.
///
/// Returns `None` for combinations the permission model does not define
/// (e.g. approving a zone, deleting zone data).
pub fn required_permission(kind: ResourceKind, operation: Operation) -> Option<PermissionKey> {
    use Operation::*;
    use PermissionKey::*;

    let key = match (kind, operation) {
        (ResourceKind::Zones, List | Get) => ZonesRead,
        (ResourceKind::Zones, Create | Update) => ZonesWrite,
        (ResourceKind::Zones, Delete) => ZonesDelete,
        (ResourceKind::Iot, List | Get) => IotRead,
        (ResourceKind::Iot, Create | Update) => IotWrite,
        (ResourceKind::Iot, Delete) => IotDelete,
        (ResourceKind::Farmers, List | Get) => FarmersRead,
        (ResourceKind::Farmers, Create | Update) => FarmersWrite,
        (ResourceKind::Farmers, Delete) => FarmersDelete,
        (ResourceKind::Recommendations, List | Get) => RecommendationsRead,
        (ResourceKind::Recommendations, Create | Update) => RecommendationsWrite,
        (ResourceKind::Recommendations, Approve) => RecommendationsApprove,
        (ResourceKind::ZoneData, List | Get) => ZoneDataRead,
        (ResourceKind::ZoneData, Create | Update) => ZoneDataWrite,
        (ResourceKind::Users, List | Get) => UsersRead,
        (ResourceKind::Users, Create | Update) => UsersWrite,
        (ResourceKind::Users, Delete) => UsersDelete,
        _ => return None,
    };
    Some(key)
}

// =============================================================================
// ResourceRequest
// =============================================================================

/// A resource operation, before authorization.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    /// Resource class.
    pub kind: ResourceKind,
    /// Operation.
    pub operation: Operation,
    /// Item id, for single-item operations.
    pub id: Option<String>,
    /// Zone the targeted resource belongs to.
    pub zone: Option<ZoneId>,
    /// Request body.
    pub body: Option<serde_json::Value>,
}

impl ResourceRequest {
    /// Creates a request.
    pub fn new(kind: ResourceKind, operation: Operation) -> Self {
        Self {
            kind,
            operation,
            id: None,
            zone: None,
            body: None,
        }
    }

    /// Lists a collection.
    pub fn list(kind: ResourceKind) -> Self {
        Self::new(kind, Operation::List)
    }

    /// Reads one item.
    pub fn get(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::new(kind, Operation::Get).with_id(id)
    }

    /// Creates an item.
    pub fn create(kind: ResourceKind, body: serde_json::Value) -> Self {
        Self::new(kind, Operation::Create).with_body(body)
    }

    /// Replaces an item.
    pub fn update(kind: ResourceKind, id: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(kind, Operation::Update).with_id(id).with_body(body)
    }

    /// Deletes an item.
    pub fn delete(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::new(kind, Operation::Delete).with_id(id)
    }

    /// Approves an item.
    pub fn approve(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::new(kind, Operation::Approve).with_id(id)
    }

    /// Sets the item id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the zone of the targeted resource.
    pub fn in_zone(mut self, zone: impl Into<ZoneId>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the permission this request requires.
    pub fn permission(&self) -> AuthResult<PermissionKey> {
        required_permission(self.kind, self.operation).ok_or_else(|| {
            AuthError::internal(format!(
                "operation '{}' is not defined for resource '{}'",
                self.operation, self.kind
            ))
        })
    }

    /// Returns the request path.
    ///
    /// # Errors
    ///
    /// [`AuthError::Internal`] if the operation needs an id and none is set,
    /// or if the id or zone would not stay a single path segment.
    pub fn path(&self) -> AuthResult<String> {
        let base = self.kind.collection_path(self.zone.as_ref())?;
        match (&self.id, self.operation) {
            (Some(id), Operation::Approve) => {
                Ok(format!("{}/{}/approve", base, path_segment(id, "id")?))
            }
            (Some(id), op) if op.needs_id() => Ok(format!("{}/{}", base, path_segment(id, "id")?)),
            (None, op) if op.needs_id() => Err(AuthError::internal(format!(
                "operation '{}' on '{}' needs an id",
                op, self.kind
            ))),
            _ => Ok(base),
        }
    }
}

/// Accepts a value only if it stays one opaque path segment, so an id can
/// never reach a collection other than the one that was authorized.
fn path_segment<'a>(value: &'a str, what: &str) -> AuthResult<&'a str> {
    let rejected = value.is_empty()
        || value == "."
        || value == ".."
        || value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control());
    if rejected {
        return Err(AuthError::internal(format!("{} '{}' is not a valid path segment", what, value)));
    }
    Ok(value)
}

// =============================================================================
// Transport
// =============================================================================

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// An authorized request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Method.
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    /// `Authorization` header value.
    pub authorization: String,
    /// JSON body.
    pub body: Option<serde_json::Value>,
}

/// A transport response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// Status code.
    pub status: u16,
    /// JSON body (`null` when empty).
    pub body: serde_json::Value,
}

impl TransportResponse {
    /// Creates a response.
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Returns `true` for 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends authorized requests.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends a request.
    ///
    /// Returns `Err` only for transport failures; HTTP error statuses are
    /// returned as responses.
    async fn send(&self, request: TransportRequest) -> AuthResult<TransportResponse>;

    /// Returns the transport name.
    fn name(&self) -> &str;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn Transport>;

/// Transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport from the API configuration.
    pub fn new(config: &ApiConfig) -> AuthResult<Self> {
        Self::with_timeout(&config.base_url, config.request_timeout)
    }

    /// Creates a transport for a base URL.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AuthError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> AuthResult<TransportResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header(reqwest::header::AUTHORIZATION, &request.authorization);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::network(format!("request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::network(format!("reading response failed: {}", e)))?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };

        Ok(TransportResponse::new(status, body))
    }

    fn name(&self) -> &str {
        "http"
    }
}

// =============================================================================
// DataClient
// =============================================================================

/// Resource client that authorizes every call.
#[derive(Debug, Clone)]
pub struct DataClient {
    session: SessionManager,
    engine: PermissionEngine,
    transport: SharedTransport,
}

impl DataClient {
    /// Creates a data client.
    pub fn new(session: SessionManager, engine: PermissionEngine, transport: SharedTransport) -> Self {
        Self {
            session,
            engine,
            transport,
        }
    }

    /// Authorizes and sends a request, returning the response body.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthenticationRequired`] without a current user, or if
    ///   the endpoint answers 401
    /// - [`AuthError::AccessDenied`] if the role or zone does not permit the
    ///   operation, or if the endpoint answers 403
    /// - [`AuthError::Upstream`] for any other non-2xx status
    /// - [`AuthError::Network`] if the transport fails
    pub async fn execute(&self, request: ResourceRequest) -> AuthResult<serde_json::Value> {
        let session = self
            .session
            .current_session()
            .ok_or(AuthError::AuthenticationRequired)?;
        let permission = request.permission()?;

        let allowed = self.engine.can_access_resource(
            session.role(),
            session.zone_id(),
            permission,
            request.zone.as_ref(),
        );
        if !allowed {
            self.session.record_denied(permission, request.zone.as_ref());
            return Err(AuthError::access_denied(permission, request.zone.clone()));
        }

        let transport_request = TransportRequest {
            method: request.operation.method(),
            path: request.path()?,
            authorization: session.credential().bearer_header(),
            body: request.body.clone(),
        };
        debug!(
            method = transport_request.method.as_str(),
            path = %transport_request.path,
            transport = self.transport.name(),
            "Dispatching resource request"
        );

        let response = self.transport.send(transport_request).await?;
        match response.status {
            _ if response.is_success() => Ok(response.body),
            401 => {
                warn!(permission = %permission, "Resource endpoint rejected the credential");
                self.session.handle_unauthorized();
                Err(AuthError::AuthenticationRequired)
            }
            403 => Err(AuthError::access_denied(permission, request.zone)),
            status => Err(AuthError::upstream(status, upstream_message(&response.body))),
        }
    }

    /// Lists a collection.
    pub async fn list(&self, kind: ResourceKind, zone: Option<ZoneId>) -> AuthResult<serde_json::Value> {
        let mut request = ResourceRequest::list(kind);
        request.zone = zone;
        self.execute(request).await
    }

    /// Reads one item.
    pub async fn get(
        &self,
        kind: ResourceKind,
        id: &str,
        zone: Option<ZoneId>,
    ) -> AuthResult<serde_json::Value> {
        let mut request = ResourceRequest::get(kind, id);
        request.zone = zone;
        self.execute(request).await
    }

    /// Creates an item.
    pub async fn create(
        &self,
        kind: ResourceKind,
        body: serde_json::Value,
        zone: Option<ZoneId>,
    ) -> AuthResult<serde_json::Value> {
        let mut request = ResourceRequest::create(kind, body);
        request.zone = zone;
        self.execute(request).await
    }

    /// Replaces an item.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        body: serde_json::Value,
        zone: Option<ZoneId>,
    ) -> AuthResult<serde_json::Value> {
        let mut request = ResourceRequest::update(kind, id, body);
        request.zone = zone;
        self.execute(request).await
    }

    /// Deletes an item.
    pub async fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        zone: Option<ZoneId>,
    ) -> AuthResult<serde_json::Value> {
        let mut request = ResourceRequest::delete(kind, id);
        request.zone = zone;
        self.execute(request).await
    }
}

fn upstream_message(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(map) => ["message", "error", "msg"]
            .iter()
            .find_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
