use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};
use uuid::Uuid;

pub const DEFAULT_CSRF_TOKEN: &str = "mock-csrf-token";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItem {
    pub name: String,
}

#[derive(Debug)]
pub struct AppState {
    csrf_token: String,
    items: RwLock<Vec<Item>>,
}

pub type Db = Arc<AppState>;

pub fn app() -> Router {
    router(DEFAULT_CSRF_TOKEN.to_string())
}

/// Router whose CSRF endpoint hands out `csrf_token`.
pub fn router(csrf_token: String) -> Router {
    let db: Db = Arc::new(AppState {
        csrf_token,
        items: RwLock::new(Vec::new()),
    });
    Router::new()
        .route("/api/csrf", get(issue_csrf))
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/{id}", get(get_item).delete(delete_item))
        .with_state(db)
}

pub async fn run(listener: TcpListener, csrf_token: String) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, router(csrf_token)).await
}

/// Subscriber for the server binary; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .try_init();
}

/// Subscriber that writes through the test harness so output is captured.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NONE)
        .with_test_writer()
        .try_init();
}

/// Rejects unsafe requests unless they come from client script and the
/// token header matches both the `csrftoken` cookie and the issued token.
fn verify_csrf(db: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let scripted = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "XMLHttpRequest");
    let cookie_token = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v.to_string()))
        .filter_map(Result::ok)
        .find(|c| c.name() == CSRF_COOKIE)
        .map(|c| c.value().to_string());
    let header_token = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());

    let reason = if !scripted {
        Some("request was not issued by client script")
    } else if cookie_token.is_none() {
        Some("CSRF cookie not set")
    } else if header_token != cookie_token.as_deref() || header_token != Some(db.csrf_token.as_str()) {
        Some("CSRF token missing or incorrect")
    } else {
        None
    };

    match reason {
        Some(reason) => {
            debug!(reason, "csrf check failed");
            let body = Json(json!({ "detail": format!("CSRF Failed: {reason}") }));
            Err((StatusCode::FORBIDDEN, body).into_response())
        }
        None => Ok(()),
    }
}

async fn issue_csrf(State(db): State<Db>) -> Response {
    let cookie = format!("{CSRF_COOKIE}={}; Path=/; SameSite=Lax", db.csrf_token);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "csrftoken": db.csrf_token })),
    )
        .into_response()
}

async fn list_items(State(db): State<Db>) -> Json<serde_json::Value> {
    let items = db.items.read().await.clone();
    Json(json!({ "items": items }))
}

async fn create_item(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Item>, Response> {
    verify_csrf(&db, &headers)?;
    let input: CreateItem = serde_json::from_slice(&body).map_err(|e| {
        let detail = Json(json!({ "detail": e.to_string() }));
        (StatusCode::UNPROCESSABLE_ENTITY, detail).into_response()
    })?;
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
    };
    db.items.write().await.push(item.clone());
    Ok(Json(item))
}

async fn get_item(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Item>, StatusCode> {
    let items = db.items.read().await;
    items
        .iter()
        .find(|i| i.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_item(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    verify_csrf(&db, &headers)?;
    let mut items = db.items.write().await;
    let idx = items
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    items.remove(idx);
    Ok(StatusCode::NO_CONTENT)
}
