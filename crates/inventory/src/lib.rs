//! Inventory domain module.
//!
//! This crate contains the business rules for pantry stock, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod name;

pub use item::{
    InventoryItem, Quantity, RemoveOutcome, StockChange, StockCommand, decide,
};
pub use name::ItemName;
