use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    dto::cart::{AddToCartRequest, CartResponse, UpdateQuantityRequest},
    error::CartResult,
};

pub mod http;

pub use http::HttpCartApi;

#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /cart`
    async fn fetch_cart(&self, token: &SecretString) -> CartResult<CartResponse>;

    /// `POST /cart`
    async fn add_item(
        &self,
        token: &SecretString,
        payload: &AddToCartRequest,
    ) -> CartResult<serde_json::Value>;

    /// `DELETE /cart/{product_id}`
    async fn remove_item(&self, token: &SecretString, product_id: &str) -> CartResult<()>;

    /// `PUT /cart/{product_id}`
    async fn update_item(
        &self,
        token: &SecretString,
        product_id: &str,
        payload: &UpdateQuantityRequest,
    ) -> CartResult<()>;

    /// `DELETE /cart`
    async fn clear(&self, token: &SecretString) -> CartResult<()>;
}
