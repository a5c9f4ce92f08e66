use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::dto::cart::CartEntry;

/// A product in the cart, flattened from the server's `{productId, quantity}` pair.
///
/// Serializes as `{"_id": .., "quantity": .., ...attributes}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub quantity: u32,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl LineItem {
    pub fn new(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: id.into(),
            quantity,
            attributes: Map::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// `None` when no id can be found or the quantity is not positive.
    pub fn from_entry(entry: CartEntry) -> Option<Self> {
        let quantity = entry
            .quantity
            .as_u64()
            .filter(|q| *q > 0)
            .and_then(|q| u32::try_from(q).ok())?;

        match entry.product_id {
            Value::Object(mut attributes) => {
                let id = attributes
                    .get("_id")
                    .and_then(id_string)
                    .or_else(|| attributes.get("id").and_then(id_string))?;
                attributes.remove("_id");
                attributes.remove("quantity");
                Some(Self {
                    id,
                    quantity,
                    attributes,
                })
            }
            other => id_string(&other).map(|id| Self::new(id, quantity)),
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// What callers hand to `add_to_cart`: anything with an `_id` or `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ProductRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl From<&LineItem> for ProductRef {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.clone(),
            attributes: item.attributes.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for ProductRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut attributes = Map::<String, Value>::deserialize(deserializer)?;
        let id = attributes
            .get("_id")
            .and_then(id_string)
            .or_else(|| attributes.get("id").and_then(id_string))
            .ok_or_else(|| <D::Error as serde::de::Error>::missing_field("_id"))?;
        attributes.remove("_id");
        Ok(Self { id, attributes })
    }
}
