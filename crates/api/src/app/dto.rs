use serde::{Deserialize, Serialize};

use pantry_inventory::{InventoryItem, ItemName, RemoveOutcome};

use crate::app::services::InventoryListing;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub name: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub name: String,
    pub quantity: u32,
}

impl From<InventoryItem> for ItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            quantity: item.quantity.get(),
            name: item.name.into_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ItemResponse>,
    pub stale: bool,
}

impl From<InventoryListing> for ListResponse {
    fn from(listing: InventoryListing) -> Self {
        Self {
            items: listing.items.into_iter().map(ItemResponse::from).collect(),
            stale: listing.stale,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub outcome: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl RemoveResponse {
    pub fn new(name: ItemName, outcome: RemoveOutcome) -> Self {
        let (label, quantity) = match outcome {
            RemoveOutcome::Deleted => ("deleted", None),
            RemoveOutcome::Decremented(q) => ("decremented", Some(q.get())),
            RemoveOutcome::NotFound => ("not_found", None),
        };
        Self {
            outcome: label,
            name: name.into_string(),
            quantity,
        }
    }
}
