use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use pantry_core::{DomainError, ValueObject};

use crate::name::ItemName;

/// Stock count of a stored record. Always at least 1.
///
/// A record that would reach 0 is deleted instead, so zero is not representable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    pub const ONE: Quantity = Quantity(NonZeroU32::MIN);

    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn increment(self) -> Result<Self, DomainError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))
    }

    /// `None` when the decrement would reach zero.
    pub fn decrement(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }
}

impl ValueObject for Quantity {}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A stored record: the name is its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: ItemName,
    pub quantity: Quantity,
}

impl InventoryItem {
    pub fn new(name: ItemName, quantity: Quantity) -> Self {
        Self { name, quantity }
    }
}

/// Mutation requested for a single record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Add,
    Remove,
}

/// Next state of a record, decided from its current quantity and a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockChange {
    Created(Quantity),
    Incremented(Quantity),
    Decremented(Quantity),
    Deleted,
    /// `Remove` on a missing record; nothing is written.
    Unchanged,
}

/// Result of a `remove` as seen by callers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveOutcome {
    Deleted,
    Decremented(Quantity),
    NotFound,
}

impl StockChange {
    /// Quantity stored after the change, or `None` if no record remains.
    pub fn resulting_quantity(self) -> Option<Quantity> {
        match self {
            StockChange::Created(q) | StockChange::Incremented(q) | StockChange::Decremented(q) => {
                Some(q)
            }
            StockChange::Deleted | StockChange::Unchanged => None,
        }
    }

    /// What a remove reports to its caller. `None` for add-side changes.
    pub fn remove_outcome(self) -> Option<RemoveOutcome> {
        match self {
            StockChange::Deleted => Some(RemoveOutcome::Deleted),
            StockChange::Decremented(q) => Some(RemoveOutcome::Decremented(q)),
            StockChange::Unchanged => Some(RemoveOutcome::NotFound),
            StockChange::Created(_) | StockChange::Incremented(_) => None,
        }
    }
}

/// Decide the next state of one record.
///
/// Pure and deterministic: `current` is the quantity read from storage (`None`
/// when the record is absent). Performing the change is the caller's job.
pub fn decide(current: Option<Quantity>, command: StockCommand) -> Result<StockChange, DomainError> {
    match (command, current) {
        (StockCommand::Add, None) => Ok(StockChange::Created(Quantity::ONE)),
        (StockCommand::Add, Some(q)) => Ok(StockChange::Incremented(q.increment()?)),
        (StockCommand::Remove, None) => Ok(StockChange::Unchanged),
        (StockCommand::Remove, Some(q)) => Ok(match q.decrement() {
            Some(next) => StockChange::Decremented(next),
            None => StockChange::Deleted,
        }),
    }
}
