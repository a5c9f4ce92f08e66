use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    api::CartApi,
    auth::{SessionToken, TokenSource},
    clock::{Clock, SystemClock},
    config::CartConfig,
    dto::cart::{AddToCartRequest, CartResponse, UpdateQuantityRequest},
    error::CartError,
    models::{LineItem, ProductRef},
};

#[derive(Debug, Default)]
struct CartState {
    items: Vec<LineItem>,
    loading: bool,
    last_fetched: Option<DateTime<Utc>>,
}

pub struct CartStore {
    api: Arc<dyn CartApi>,
    tokens: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    state: RwLock<CartState>,
}

struct LoadingGuard<'a>(&'a RwLock<CartState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.write().loading = false;
    }
}

impl CartStore {
    pub fn new(api: Arc<dyn CartApi>, tokens: Arc<dyn TokenSource>, config: &CartConfig) -> Self {
        Self {
            api,
            tokens,
            clock: Arc::new(SystemClock),
            cache_ttl: config.cache_ttl,
            state: RwLock::new(CartState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cart(&self) -> Vec<LineItem> {
        self.state.read().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_fetched
    }

    pub fn find(&self, product_id: &str) -> Option<LineItem> {
        self.state
            .read()
            .items
            .iter()
            .find(|item| item.id == product_id)
            .cloned()
    }

    pub fn item_count(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn total_quantity(&self) -> u64 {
        self.state
            .read()
            .items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state.write().loading = true;
        LoadingGuard(&self.state)
    }

    fn reset(&self) {
        let mut state = self.state.write();
        state.items.clear();
        state.last_fetched = None;
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.state.read().last_fetched else {
            return false;
        };
        // a clock that went backwards counts as stale
        (now - last)
            .to_std()
            .map(|elapsed| elapsed < self.cache_ttl)
            .unwrap_or(false)
    }

    /// Any failure empties the cart.
    pub async fn refresh(&self, force: bool) {
        let Some(token) = self.tokens.token() else {
            debug!("no token, clearing cart");
            self.reset();
            return;
        };

        let now = self.clock.now();
        if !force && self.is_fresh(now) {
            debug!("using cached cart");
            return;
        }

        let _loading = self.begin_loading();
        match self.api.fetch_cart(&token).await {
            Ok(response) => {
                let items = flatten(response);
                info!(count = items.len(), "cart loaded");
                let mut state = self.state.write();
                state.items = items;
                state.last_fetched = Some(now);
            }
            Err(CartError::Status { status, body }) => {
                warn!(status = %status, body = %body, "cart fetch rejected, clearing cart");
                self.state.write().items.clear();
            }
            Err(err) => {
                error!(error = %err, "failed to load cart");
                self.state.write().items.clear();
            }
        }
    }

    /// `Some(true)` when a new line was accepted, `Some(false)` on an error
    /// status. `None` when signed out, bumped via `update_quantity`, or the
    /// request failed.
    pub async fn add_to_cart(&self, product: &ProductRef) -> Option<bool> {
        let Some(token) = self.tokens.token() else {
            debug!(product_id = %product.id, "not signed in, cannot add to cart");
            return None;
        };

        if let Some(existing) = self.find(&product.id) {
            debug!(product_id = %product.id, quantity = existing.quantity, "already in cart, bumping quantity");
            self.update_quantity(&product.id, existing.quantity.saturating_add(1))
                .await;
            return None;
        }

        let _loading = self.begin_loading();
        let payload = AddToCartRequest {
            product_id: product.id.clone(),
            quantity: 1,
        };
        match self.api.add_item(&token, &payload).await {
            Ok(response) => {
                debug!(product_id = %product.id, response = %response, "add to cart accepted");
                self.refresh(true).await;
                info!(product_id = %product.id, "product added to cart");
                Some(true)
            }
            Err(CartError::Status { status, body }) => {
                error!(product_id = %product.id, status = %status, body = %body, "failed to add product to cart");
                Some(false)
            }
            Err(err) => {
                error!(product_id = %product.id, error = %err, "error adding product to cart");
                None
            }
        }
    }

    pub async fn remove_from_cart(&self, product_id: &str) {
        let Some(token) = self.tokens.token() else {
            debug!(product_id = %product_id, "not signed in, cannot remove from cart");
            return;
        };

        let _loading = self.begin_loading();
        match self.api.remove_item(&token, product_id).await {
            Ok(()) => {
                self.refresh(true).await;
                info!(product_id = %product_id, "product removed from cart");
            }
            Err(err) => {
                error!(product_id = %product_id, status = ?err.status(), error = %err, "failed to remove product from cart");
            }
        }
    }

    pub async fn update_quantity(&self, product_id: &str, quantity: u32) {
        let Some(token) = self.tokens.token() else {
            debug!(product_id = %product_id, "not signed in, cannot update quantity");
            return;
        };

        let _loading = self.begin_loading();
        let payload = UpdateQuantityRequest { quantity };
        match self.api.update_item(&token, product_id, &payload).await {
            Ok(()) => {
                self.refresh(true).await;
                info!(product_id = %product_id, quantity, "quantity updated");
            }
            Err(err) => {
                error!(product_id = %product_id, quantity, status = ?err.status(), error = %err, "failed to update quantity");
            }
        }
    }

    /// Clears locally without a follow-up fetch.
    pub async fn clear_cart(&self) {
        let Some(token) = self.tokens.token() else {
            debug!("not signed in, cannot clear cart");
            return;
        };

        let _loading = self.begin_loading();
        match self.api.clear(&token).await {
            Ok(()) => {
                self.state.write().items.clear();
                info!("cart cleared");
            }
            Err(err) => {
                error!(status = ?err.status(), error = %err, "failed to clear cart");
            }
        }
    }

    pub async fn on_token_changed(&self) {
        if self.tokens.token().is_some() {
            debug!("token present, loading cart");
            self.refresh(true).await;
        } else {
            debug!("token absent, clearing cart");
            self.reset();
        }
    }

    /// Applies the current token once, then every change of `session` until
    /// either the session or the store is dropped.
    pub fn watch_token(self: &Arc<Self>, session: &SessionToken) -> JoinHandle<()> {
        // the store may own this session's sender; a strong ref would never let it drop
        let store = Arc::downgrade(self);
        let mut changes = session.subscribe();
        tokio::spawn(async move {
            changes.mark_unchanged();
            loop {
                let Some(current) = store.upgrade() else {
                    debug!("store dropped, no longer watching token");
                    break;
                };
                current.on_token_changed().await;
                drop(current);

                if changes.changed().await.is_err() {
                    debug!("session dropped, no longer watching token");
                    break;
                }
            }
        })
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("CartStore")
            .field("items", &state.items.len())
            .field("loading", &state.loading)
            .field("last_fetched", &state.last_fetched)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

fn flatten(response: CartResponse) -> Vec<LineItem> {
    response
        .items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            let raw = entry.product_id.clone();
            let item = LineItem::from_entry(entry);
            if item.is_none() {
                warn!(product = %raw, "skipping cart entry without usable id or quantity");
            }
            item
        })
        .collect()
}
