//! Item names and the one normalization rule applied wherever a name is a key.

use serde::{Deserialize, Serialize};

use pantry_core::{DomainError, ValueObject};

/// Normalized item name.
///
/// Surrounding whitespace is trimmed, the first character is upper-cased and the
/// remainder is kept as typed. Writes, removals and lookups all go through this
/// type, so `"banana"`, `" banana "` and `"Banana"` address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ItemName {
    /// Parse a name supplied to `add`/`remove`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        normalize(raw)
            .map(Self)
            .ok_or_else(|| DomainError::invalid_name("name cannot be empty"))
    }

    /// Parse a search term. Blank input is a distinct validation error.
    pub fn parse_search(raw: &str) -> Result<Self, DomainError> {
        normalize(raw).map(Self).ok_or(DomainError::EmptySearchTerm)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;

    let mut out = String::with_capacity(trimmed.len() + 2);
    out.extend(first.to_uppercase());
    out.push_str(chars.as_str());
    Some(out)
}

impl ValueObject for ItemName {}

impl core::fmt::Display for ItemName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemName> for String {
    fn from(value: ItemName) -> Self {
        value.0
    }
}
