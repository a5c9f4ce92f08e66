//! In-process cart backend for integration tests.
//!
//! Serves the same `/cart` routes as the storefront API, keeps the cart in
//! memory and records every request it sees, including rejected ones.

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, put},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use storefront_cart::dto::cart::{AddToCartRequest, UpdateQuantityRequest};

pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Default)]
struct Inner {
    catalog: HashMap<String, Value>,
    rows: Mutex<Vec<(String, u32)>>,
    requests: Mutex<Vec<Recorded>>,
    fail_status: Mutex<Option<StatusCode>>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Inner>,
}

impl FakeBackend {
    /// Backend whose `GET /cart` populates products found in `catalog`.
    pub fn with_catalog(products: impl IntoIterator<Item = Value>) -> Self {
        let catalog = products
            .into_iter()
            .filter_map(|product| {
                let id = product.get("_id")?.as_str()?.to_string();
                Some((id, product))
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                catalog,
                ..Inner::default()
            }),
        }
    }

    pub fn seed(&self, product_id: &str, quantity: u32) {
        self.inner
            .rows
            .lock()
            .push((product_id.to_string(), quantity));
    }

    pub fn fail_with(&self, status: Option<StatusCode>) {
        *self.inner.fail_status.lock() = status;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.requests.lock().clone()
    }

    /// `"METHOD /path"` for each request, in arrival order.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.inner.requests.lock().clear();
    }

    /// Starts serving on an ephemeral port and returns the base url.
    pub async fn spawn(&self) -> anyhow::Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(self.clone());
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                eprintln!("fake cart backend stopped: {err}");
            }
        });
        Ok(format!("http://{addr}"))
    }

    fn record(&self, method: &'static str, path: String, headers: &HeaderMap, body: Option<Value>) {
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(String::from)
        };
        self.inner.requests.lock().push(Recorded {
            method,
            path,
            body,
            authorization: header_value(header::AUTHORIZATION.as_str()),
            request_id: header_value("x-request-id"),
        });
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        if let Some(status) = *self.inner.fail_status.lock() {
            return Err(status);
        }
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;
        if token.trim() != TOKEN {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(())
    }

    fn cart_body(&self) -> Value {
        let items: Vec<Value> = self
            .inner
            .rows
            .lock()
            .iter()
            .map(|(id, quantity)| {
                let product = self
                    .inner
                    .catalog
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| json!(id));
                json!({ "productId": product, "quantity": quantity })
            })
            .collect();
        json!({ "items": items })
    }
}

fn router(backend: FakeBackend) -> Router {
    Router::new()
        .route("/cart", get(cart_list).post(add_to_cart).delete(clear_cart))
        .route(
            "/cart/{product_id}",
            put(update_quantity).delete(remove_from_cart),
        )
        .with_state(backend)
}

async fn cart_list(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    backend.record("GET", "/cart".into(), &headers, None);
    backend.authorize(&headers)?;
    Ok(Json(backend.cart_body()))
}

async fn add_to_cart(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(payload): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    backend.record(
        "POST",
        "/cart".into(),
        &headers,
        serde_json::to_value(&payload).ok(),
    );
    backend.authorize(&headers)?;
    if payload.quantity == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut rows = backend.inner.rows.lock();
    match rows.iter().position(|(id, _)| *id == payload.product_id) {
        Some(index) => rows[index].1 = payload.quantity,
        None => rows.push((payload.product_id.clone(), payload.quantity)),
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "OK", "data": { "productId": payload.product_id } })),
    ))
}

async fn update_quantity(
    State(backend): State<FakeBackend>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<Json<Value>, StatusCode> {
    backend.record(
        "PUT",
        format!("/cart/{product_id}"),
        &headers,
        serde_json::to_value(&payload).ok(),
    );
    backend.authorize(&headers)?;

    let mut rows = backend.inner.rows.lock();
    let row = rows
        .iter_mut()
        .find(|(id, _)| *id == product_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    row.1 = payload.quantity;
    Ok(Json(json!({ "message": "OK" })))
}

async fn remove_from_cart(
    State(backend): State<FakeBackend>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    backend.record("DELETE", format!("/cart/{product_id}"), &headers, None);
    backend.authorize(&headers)?;

    let mut rows = backend.inner.rows.lock();
    let before = rows.len();
    rows.retain(|(id, _)| *id != product_id);
    if rows.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "message": "Removed from cart" })))
}

async fn clear_cart(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    backend.record("DELETE", "/cart".into(), &headers, None);
    backend.authorize(&headers)?;
    backend.inner.rows.lock().clear();
    Ok(Json(json!({ "message": "Cart cleared" })))
}
