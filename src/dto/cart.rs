use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// Body of `GET /cart`. A missing `items` array is an empty cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Option<Vec<CartEntry>>,
}

/// One server-side cart row. `productId` is either a populated product or its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    #[serde(default)]
    pub product_id: Value,
    #[serde(default)]
    pub quantity: Value,
}
