// system-tests/tests/helpers/agency_stub.rs
// ============================================================================
// Module: Agency Stub
// Description: In-process HTTP stub of the agency REST API.
// Purpose: Exercise the real transport against login, CRUD and role gates.
// Dependencies: axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! Serves the agency API on a loopback port: `/api/auth/*`, employees,
//! clients, nested projects and payments, and the notification feed.
//! `/api/admin/database-sync` is deliberately absent so speculative probes
//! see 404. Fault toggles in [`StubBehavior`] flip individual contracts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::COOKIE;
use axum::http::header::HOST;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accounts accepted by the stub: (identifier, password, role).
pub const ACCOUNTS: [(&str, &str, &str); 2] = [
    ("admin@example.com", "AdminPass123", "admin"),
    ("intern@example.com", "InternPass123", "intern"),
];

/// Contract toggles; the default conforms to every built-in scenario.
#[derive(Debug, Clone)]
pub struct StubBehavior {
    /// Issue `Set-Cookie` sessions instead of body tokens.
    pub cookie_only: bool,
    /// Name of the token field in login responses.
    pub token_field: &'static str,
    /// Reject one-time payments without `proof_url`.
    pub require_proof: bool,
    /// Delete dependents with their parent instead of refusing.
    pub cascade: bool,
    /// Invalidate tokens on logout.
    pub revoke_on_logout: bool,
    /// Serve the notification feed without authentication.
    pub open_notifications: bool,
    /// Delay applied before answering a login.
    pub login_delay: Duration,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            cookie_only: false,
            token_field: "token",
            require_proof: true,
            cascade: false,
            revoke_on_logout: true,
            open_notifications: false,
            login_delay: Duration::ZERO,
        }
    }
}

/// One request seen by the stub.
#[derive(Debug, Clone)]
pub struct StubRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// Raw `Host` header.
    pub host: Option<String>,
}

/// Mutable stub state.
#[derive(Default)]
struct AgencyState {
    /// Live session token to role.
    sessions: BTreeMap<String, String>,
    /// Collection name to id to record.
    records: BTreeMap<&'static str, BTreeMap<String, Value>>,
    /// Child id to (parent collection, parent id).
    parents: BTreeMap<String, (&'static str, String)>,
    /// Monotonic id source.
    next_id: u64,
    /// Requests in arrival order.
    requests: Vec<StubRequest>,
}

/// Shared handler state.
#[derive(Clone)]
struct Stub {
    /// Fault toggles.
    behavior: Arc<StubBehavior>,
    /// Locked state.
    state: Arc<Mutex<AgencyState>>,
}

/// Handle for a running agency stub. Aborts its listeners on drop.
pub struct AgencyStubHandle {
    /// Base URL of the primary listener.
    base_url: String,
    /// Base URL of the auth alias listener, when spawned.
    auth_base_url: Option<String>,
    /// Shared state.
    stub: Stub,
    /// Listener tasks.
    joins: Vec<JoinHandle<()>>,
}

impl AgencyStubHandle {
    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the auth alias base URL, when spawned.
    pub fn auth_base_url(&self) -> Option<&str> {
        self.auth_base_url.as_deref()
    }

    /// Returns captured requests.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.stub.state.lock().map_or_else(|_| Vec::new(), |state| state.requests.clone())
    }

    /// Returns the number of live records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.stub
            .state
            .lock()
            .map_or(0, |state| state.records.get(collection).map_or(0, BTreeMap::len))
    }

    /// Returns the number of sessions not yet logged out.
    pub fn live_sessions(&self) -> usize {
        self.stub.state.lock().map_or(0, |state| state.sessions.len())
    }

    /// Returns true when nothing created through the API is left behind.
    pub fn is_clean(&self) -> bool {
        ["employees", "clients", "projects", "payments"]
            .iter()
            .all(|collection| self.count(collection) == 0)
    }
}

impl Drop for AgencyStubHandle {
    fn drop(&mut self) {
        for join in &self.joins {
            join.abort();
        }
    }
}

/// Spawns a conforming agency stub.
pub async fn spawn_agency_stub() -> Result<AgencyStubHandle, String> {
    spawn_agency_stub_with(StubBehavior::default()).await
}

/// Spawns an agency stub with the given behavior.
pub async fn spawn_agency_stub_with(behavior: StubBehavior) -> Result<AgencyStubHandle, String> {
    let stub = Stub {
        behavior: Arc::new(behavior),
        state: Arc::new(Mutex::new(AgencyState::default())),
    };
    let (base_url, join) = serve(router(stub.clone())).await?;
    Ok(AgencyStubHandle {
        base_url,
        auth_base_url: None,
        stub,
        joins: vec![join],
    })
}

/// Spawns a stub whose auth endpoints are also served on a second origin.
pub async fn spawn_agency_stub_with_auth_alias() -> Result<AgencyStubHandle, String> {
    let mut handle = spawn_agency_stub().await?;
    let auth_only = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .with_state(handle.stub.clone());
    let (auth_base_url, join) = serve(auth_only).await?;
    handle.auth_base_url = Some(auth_base_url);
    handle.joins.push(join);
    Ok(handle)
}

/// Binds a loopback listener and serves the router on it.
async fn serve(app: Router) -> Result<(String, JoinHandle<()>), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("agency stub bind failed: {err}"))?;
    let base_url = format!("http://{}", listener.local_addr().map_err(|err| err.to_string())?);
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((base_url, join))
}

/// Builds the full API router.
fn router(stub: Stub) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/notifications", get(notifications))
        .route("/api/employees", get(list_employees).post(create_employee))
        .route("/api/employees/{id}", get(read_employee).put(update_employee).delete(delete_employee))
        .route("/api/clients", post(create_client))
        .route("/api/clients/{id}", get(read_client).put(update_client).delete(delete_client))
        .route("/api/clients/{id}/projects", post(create_project))
        .route("/api/projects/{id}", get(read_project).delete(delete_project))
        .route("/api/projects/{id}/payments", post(create_payment))
        .route("/api/payments/{id}", get(read_payment).delete(delete_payment))
        .with_state(stub)
}

// ============================================================================
// SECTION: Auth Handlers
// ============================================================================

async fn login(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    stub.record("POST", "/api/auth/login", &headers);
    if !stub.behavior.login_delay.is_zero() {
        tokio::time::sleep(stub.behavior.login_delay).await;
    }
    let identifier = body
        .get("email")
        .or_else(|| body.get("username"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    let Some((email, _, role)) = ACCOUNTS
        .iter()
        .find(|(account, secret, _)| *account == identifier && *secret == password)
    else {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };

    let token = stub.with_state(|state| {
        state.next_id += 1;
        let token = format!("stub-token-{}-{role}", state.next_id);
        state.sessions.insert(token.clone(), (*role).to_string());
        token
    });
    let user = json!({ "email": email, "role": role });
    if stub.behavior.cookie_only {
        let mut response = (StatusCode::OK, Json(json!({ "user": user }))).into_response();
        if let Ok(cookie) = HeaderValue::from_str(&format!("sid={token}; Path=/; HttpOnly")) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        return response;
    }
    let mut body = serde_json::Map::new();
    body.insert(stub.behavior.token_field.to_string(), Value::String(token));
    body.insert("user".to_string(), user);
    (StatusCode::OK, Json(Value::Object(body))).into_response()
}

async fn logout(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    stub.record("POST", "/api/auth/logout", &headers);
    let Some(token) = presented_token(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    let known = stub.with_state(|state| {
        let known = state.sessions.contains_key(&token);
        if known && stub.behavior.revoke_on_logout {
            state.sessions.remove(&token);
        }
        known
    });
    if known {
        (StatusCode::OK, Json(json!({ "message": "Logged out" }))).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Not authenticated")
    }
}

// ============================================================================
// SECTION: Gated Reads
// ============================================================================

async fn notifications(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    stub.record("GET", "/api/notifications", &headers);
    if stub.behavior.open_notifications {
        return (StatusCode::OK, Json(json!({ "data": [] }))).into_response();
    }
    match stub.authorize(&headers, &["admin", "intern"]) {
        Ok(_) => (StatusCode::OK, Json(json!({ "data": [] }))).into_response(),
        Err(response) => response,
    }
}

async fn list_employees(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    stub.record("GET", "/api/employees", &headers);
    if let Err(response) = stub.authorize(&headers, &["admin"]) {
        return response;
    }
    let data: Vec<Value> = stub.with_state(|state| {
        state.records.get("employees").map_or_else(Vec::new, |records| records.values().cloned().collect())
    });
    (StatusCode::OK, Json(json!({ "data": data }))).into_response()
}

// ============================================================================
// SECTION: Resource Handlers
// ============================================================================

async fn create_employee(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", "/api/employees", &headers);
    stub.create(&headers, "employees", None, body)
}

async fn read_employee(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("GET", &format!("/api/employees/{id}"), &headers);
    stub.read(&headers, "employees", &id)
}

async fn update_employee(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("PUT", &format!("/api/employees/{id}"), &headers);
    stub.update(&headers, "employees", &id, &body)
}

async fn delete_employee(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("DELETE", &format!("/api/employees/{id}"), &headers);
    stub.delete(&headers, "employees", &id)
}

async fn create_client(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", "/api/clients", &headers);
    stub.create(&headers, "clients", None, body)
}

async fn read_client(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("GET", &format!("/api/clients/{id}"), &headers);
    stub.read(&headers, "clients", &id)
}

async fn update_client(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("PUT", &format!("/api/clients/{id}"), &headers);
    stub.update(&headers, "clients", &id, &body)
}

async fn delete_client(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("DELETE", &format!("/api/clients/{id}"), &headers);
    stub.delete(&headers, "clients", &id)
}

async fn create_project(
    State(stub): State<Stub>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", &format!("/api/clients/{client_id}/projects"), &headers);
    stub.create(&headers, "projects", Some(("clients", client_id)), body)
}

async fn read_project(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("GET", &format!("/api/projects/{id}"), &headers);
    stub.read(&headers, "projects", &id)
}

async fn delete_project(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("DELETE", &format!("/api/projects/{id}"), &headers);
    stub.delete(&headers, "projects", &id)
}

async fn create_payment(
    State(stub): State<Stub>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", &format!("/api/projects/{project_id}/payments"), &headers);
    let missing_proof = body.get("type").and_then(Value::as_str) == Some("one-time")
        && body.get("proof_url").and_then(Value::as_str).is_none_or(str::is_empty);
    if stub.behavior.require_proof && missing_proof {
        return error(StatusCode::BAD_REQUEST, "proof_url is required for one-time payments");
    }
    stub.create(&headers, "payments", Some(("projects", project_id)), body)
}

async fn read_payment(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("GET", &format!("/api/payments/{id}"), &headers);
    stub.read(&headers, "payments", &id)
}

async fn delete_payment(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    stub.record("DELETE", &format!("/api/payments/{id}"), &headers);
    stub.delete(&headers, "payments", &id)
}

// ============================================================================
// SECTION: State Operations
// ============================================================================

impl Stub {
    /// Runs a closure under the state lock; a poisoned lock is recovered.
    fn with_state<T>(&self, f: impl FnOnce(&mut AgencyState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn record(&self, method: &str, path: &str, headers: &HeaderMap) {
        let header = |name| headers.get(name).and_then(|value: &HeaderValue| value.to_str().ok());
        let authorization = header(AUTHORIZATION).map(str::to_string);
        let host = header(HOST).map(str::to_string);
        self.with_state(|state| {
            state.requests.push(StubRequest {
                method: method.to_string(),
                path: path.to_string(),
                authorization,
                host,
            });
        });
    }

    /// Resolves the caller's role and checks it against `allowed`.
    fn authorize(&self, headers: &HeaderMap, allowed: &[&str]) -> Result<String, Response> {
        let role = presented_token(headers)
            .and_then(|token| self.with_state(|state| state.sessions.get(&token).cloned()));
        match role {
            None => Err(error(StatusCode::UNAUTHORIZED, "Not authenticated")),
            Some(role) if allowed.contains(&role.as_str()) => Ok(role),
            Some(_) => Err(error(StatusCode::FORBIDDEN, "Insufficient permissions")),
        }
    }

    fn create(
        &self,
        headers: &HeaderMap,
        collection: &'static str,
        parent: Option<(&'static str, String)>,
        body: Value,
    ) -> Response {
        if let Err(response) = self.authorize(headers, &["admin"]) {
            return response;
        }
        let Value::Object(mut fields) = body else {
            return error(StatusCode::BAD_REQUEST, "body must be an object");
        };
        self.with_state(|state| {
            if let Some((parent_collection, parent_id)) = &parent
                && !state.records.get(parent_collection).is_some_and(|r| r.contains_key(parent_id))
            {
                return error(StatusCode::NOT_FOUND, "parent not found");
            }
            state.next_id += 1;
            let id = state.next_id.to_string();
            fields.insert("id".to_string(), Value::String(id.clone()));
            let record = Value::Object(fields);
            state.records.entry(collection).or_default().insert(id.clone(), record.clone());
            if let Some(parent) = parent {
                state.parents.insert(id, parent);
            }
            (StatusCode::CREATED, Json(json!({ "data": record }))).into_response()
        })
    }

    fn read(&self, headers: &HeaderMap, collection: &'static str, id: &str) -> Response {
        if let Err(response) = self.authorize(headers, &["admin", "intern"]) {
            return response;
        }
        self.with_state(|state| {
            state.records.get(collection).and_then(|records| records.get(id)).map_or_else(
                || error(StatusCode::NOT_FOUND, "not found"),
                |record| (StatusCode::OK, Json(record.clone())).into_response(),
            )
        })
    }

    fn update(&self, headers: &HeaderMap, collection: &'static str, id: &str, body: &Value) -> Response {
        if let Err(response) = self.authorize(headers, &["admin"]) {
            return response;
        }
        self.with_state(|state| {
            let Some(Value::Object(record)) =
                state.records.get_mut(collection).and_then(|records| records.get_mut(id))
            else {
                return error(StatusCode::NOT_FOUND, "not found");
            };
            if let Value::Object(changes) = body {
                for (key, value) in changes {
                    record.insert(key.clone(), value.clone());
                }
            }
            (StatusCode::OK, Json(Value::Object(record.clone()))).into_response()
        })
    }

    fn delete(&self, headers: &HeaderMap, collection: &'static str, id: &str) -> Response {
        if let Err(response) = self.authorize(headers, &["admin"]) {
            return response;
        }
        let cascade = self.behavior.cascade;
        self.with_state(|state| {
            if !state.records.get(collection).is_some_and(|records| records.contains_key(id)) {
                return error(StatusCode::NOT_FOUND, "not found");
            }
            let dependents = descendants(state, collection, id);
            if !dependents.is_empty() && !cascade {
                return error(StatusCode::CONFLICT, "resource has dependent records");
            }
            for (child_collection, child_id) in dependents {
                if let Some(records) = state.records.get_mut(child_collection) {
                    records.remove(&child_id);
                }
                state.parents.remove(&child_id);
            }
            if let Some(records) = state.records.get_mut(collection) {
                records.remove(id);
            }
            state.parents.remove(id);
            StatusCode::NO_CONTENT.into_response()
        })
    }
}

/// Collects every live record below `(collection, id)`.
fn descendants(state: &AgencyState, collection: &str, id: &str) -> Vec<(&'static str, String)> {
    let mut found = Vec::new();
    let mut frontier = vec![(collection.to_string(), id.to_string())];
    while let Some((parent_collection, parent_id)) = frontier.pop() {
        for (child_id, (owner_collection, owner_id)) in &state.parents {
            if *owner_collection == parent_collection && *owner_id == parent_id {
                let child_collection = if parent_collection == "clients" { "projects" } else { "payments" };
                found.push((child_collection, child_id.clone()));
                frontier.push((child_collection.to_string(), child_id.clone()));
            }
        }
    }
    found
}

/// Extracts a bearer token or `sid` cookie.
fn presented_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| cookies.split(';').find_map(|pair| pair.trim().strip_prefix("sid=")))
        .map(str::to_string)
}

/// Builds a JSON error response.
fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
