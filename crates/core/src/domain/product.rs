use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::pricing::{compute_margin_percent, MarginEstimate};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub price: Decimal,
    /// Raw-material cost per unit. Only administrators may set or see it.
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingRequiredFields(vec!["name".to_string()]));
        }
        if self.price <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "product price must be greater than zero".to_string(),
            ));
        }
        if matches!(self.unit_cost, Some(cost) if cost < Decimal::ZERO) {
            return Err(DomainError::InvariantViolation(
                "product unit cost must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Margin of one unit sold at list price, shown while registering the product.
    pub fn margin_estimate(&self) -> MarginEstimate {
        match self.unit_cost {
            Some(cost) if self.price > Decimal::ZERO => compute_margin_percent(cost, self.price),
            _ => MarginEstimate::NotAvailable,
        }
    }
}
