use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::CartApi;
use crate::{
    config::CartConfig,
    dto::cart::{AddToCartRequest, CartResponse, UpdateQuantityRequest},
    error::{CartError, CartResult},
};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct HttpCartApi {
    client: Client,
    base_url: String,
}

impl HttpCartApi {
    pub fn new(base_url: impl Into<String>) -> CartResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_config(config: &CartConfig) -> CartResult<Self> {
        Self::new(config.api_url.clone())
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> CartResult<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CartError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }

    fn item_url(&self, product_id: &str) -> String {
        format!("{}/cart/{}", self.base_url, urlencoding::encode(product_id))
    }

    fn request(&self, method: Method, url: String, token: &SecretString) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));
        self.client
            .request(method, url)
            .bearer_auth(token.expose_secret())
            .header(REQUEST_ID_HEADER, request_id.to_string())
    }
}

async fn ensure_success(response: Response) -> CartResult<Response> {
    let status = response.status();
    debug!(status = %status, "cart api responded");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CartError::Status { status, body })
}

#[async_trait]
impl CartApi for HttpCartApi {
    #[instrument(skip_all, fields(method = "GET", path = "/cart", request_id = tracing::field::Empty))]
    async fn fetch_cart(&self, token: &SecretString) -> CartResult<CartResponse> {
        let response = self
            .request(Method::GET, self.cart_url(), token)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        response
            .json::<CartResponse>()
            .await
            .map_err(|e| CartError::Decode(e.to_string()))
    }

    #[instrument(
        skip_all,
        fields(method = "POST", path = "/cart", product_id = %payload.product_id, request_id = tracing::field::Empty)
    )]
    async fn add_item(
        &self,
        token: &SecretString,
        payload: &AddToCartRequest,
    ) -> CartResult<serde_json::Value> {
        let response = self
            .request(Method::POST, self.cart_url(), token)
            .json(payload)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        // Some backends answer 201 with an empty body; that still counts as added.
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| CartError::Decode(e.to_string()))
    }

    #[instrument(
        skip_all,
        fields(method = "DELETE", path = "/cart/{product_id}", product_id = %product_id, request_id = tracing::field::Empty)
    )]
    async fn remove_item(&self, token: &SecretString, product_id: &str) -> CartResult<()> {
        let response = self
            .request(Method::DELETE, self.item_url(product_id), token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(method = "PUT", path = "/cart/{product_id}", product_id = %product_id, quantity = payload.quantity, request_id = tracing::field::Empty)
    )]
    async fn update_item(
        &self,
        token: &SecretString,
        product_id: &str,
        payload: &UpdateQuantityRequest,
    ) -> CartResult<()> {
        let response = self
            .request(Method::PUT, self.item_url(product_id), token)
            .json(payload)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(method = "DELETE", path = "/cart", request_id = tracing::field::Empty))]
    async fn clear(&self, token: &SecretString) -> CartResult<()> {
        let response = self
            .request(Method::DELETE, self.cart_url(), token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
