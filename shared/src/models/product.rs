//! Product model and stock arithmetic

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product
///
/// `stock` is mutated only through line-item lifecycle transitions (see the
/// ledger); admin edits via [`ProductUpdate`] are direct corrections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    /// Unit of measure: pcs | kg | litre | box | pack
    pub uom: String,
    pub is_best_seller: bool,
    pub is_best_offer: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Accepted unit-of-measure values
pub const UOM_CHOICES: &[&str] = &["pcs", "kg", "litre", "box", "pack"];

/// Create product payload (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub uom: Option<String>,
    pub is_best_seller: Option<bool>,
    pub is_best_offer: Option<bool>,
}

/// Update product payload (admin, partial)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub uom: Option<String>,
    pub is_best_seller: Option<bool>,
    pub is_best_offer: Option<bool>,
    pub is_active: Option<bool>,
}

/// Apply a stock decrement, clamped at zero.
///
/// `delta` is the net quantity consumed: positive for a new or increased
/// line item, negative when a quantity reduction hands stock back. Stock
/// never goes below zero even when the requested quantity exceeds what is
/// on hand; over-sell is accepted rather than rejected (backorder policy).
pub fn clamp_stock_decrement(stock: i64, delta: i64) -> i64 {
    (stock - delta).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_within_stock() {
        assert_eq!(clamp_stock_decrement(10, 3), 7);
        assert_eq!(clamp_stock_decrement(10, 10), 0);
    }

    #[test]
    fn oversell_clamps_at_zero() {
        assert_eq!(clamp_stock_decrement(5, 8), 0);
        assert_eq!(clamp_stock_decrement(0, 1), 0);
    }

    #[test]
    fn negative_delta_restores_stock() {
        // quantity reduced from 5 to 2 -> delta -3 hands 3 back
        assert_eq!(clamp_stock_decrement(7, -3), 10);
    }

    #[test]
    fn zero_delta_is_noop() {
        assert_eq!(clamp_stock_decrement(4, 0), 4);
    }
}
