//! Order schema validated at the HTTP boundary

use crate::error::{ScreeningError, ScreeningResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An order submitted for screening
///
/// Only type presence is checked. `amount` accepts any JSON number; strings
/// are never coerced into numbers or the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_name: String,
    /// Lookup key into the screening rule set
    pub country: String,
    pub amount: f64,
    pub product_type: String,
}

impl Order {
    /// Parse a raw request body
    ///
    /// Bodies that are not JSON at all are `MalformedBody`; JSON that does not
    /// match the schema is `InvalidInput`.
    pub fn from_slice(body: &[u8]) -> ScreeningResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ScreeningError::malformed_body(e.to_string()))?;
        Self::from_json(value)
    }

    /// Validate an already-parsed JSON value against the schema
    pub fn from_json(value: Value) -> ScreeningResult<Self> {
        serde_json::from_value(value).map_err(|e| ScreeningError::invalid_input(e.to_string()))
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order {} for {} ({}): {:.2} in product category {}",
            self.order_id, self.customer_name, self.country, self.amount, self.product_type
        )
    }
}
