//! Order and line-item models
//!
//! Status values keep the exact db spellings of the storefront API
//! ("Pending", "Paid", "COD", ...) so existing clients keep working.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Placed, awaiting payment/processing
    Pending,
    /// Payment confirmed, being prepared
    Processing,
    /// Handed to delivery
    Shipped,
    /// Delivered and closed
    Completed,
    /// Cancelled (by admin or the stale-order reaper); stock restored
    Cancelled,
}

impl OrderStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Processing" => Some(Self::Processing),
            "Shipped" => Some(Self::Shipped),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Payment reconciliation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting confirmation from the provider
    Pending,
    /// Confirmed paid (terminal; never downgraded)
    Paid,
    /// Provider reported failure
    Failed,
}

impl PaymentStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Paid" => Some(Self::Paid),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
        }
    }
}

/// Payment method selected at order creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// Card payment
    Card,
    /// Online payment
    Online,
}

impl PaymentMethod {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "COD" => Some(Self::Cod),
            "Card" => Some(Self::Card),
            "Online" => Some(Self::Online),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::Card => "Card",
            Self::Online => "Online",
        }
    }
}

/// Customer order
///
/// `total` is derived: always the sum of the current line items'
/// quantity×price at last recompute, never set by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub delivery_date: Option<i64>,
    pub total: Decimal,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub stripe_payment_intent: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Parsed payment status; `None` only for a corrupt row.
    pub fn payment_state(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_db(&self.payment_status)
    }

    /// Paid is terminal: checkout creation and the failed-payment webhook
    /// both refuse to touch an order once this is true.
    pub fn is_paid(&self) -> bool {
        self.payment_state() == Some(PaymentStatus::Paid)
    }
}

/// Order line item
///
/// `price` is the unit price snapshotted from the product at creation, so
/// later catalog price changes do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price: Decimal,
}

impl OrderItem {
    /// quantity × unit price
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

/// Sum of quantity×price over line items, the order total invariant.
pub fn order_total<'a, I>(items: I) -> Decimal
where
    I: IntoIterator<Item = &'a OrderItem>,
{
    items.into_iter().map(OrderItem::line_total).sum()
}

/// Convert an order total to minor currency units (pence/cents).
///
/// Totals come from NUMERIC(10,2) columns, so the scaled value is exact;
/// `None` only on overflow or a corrupt (negative) amount.
pub fn total_minor_units(total: Decimal) -> Option<i64> {
    if total.is_sign_negative() {
        return None;
    }
    (total * Decimal::ONE_HUNDRED).round().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, price: &str) -> OrderItem {
        OrderItem {
            id: 1,
            order_id: 1,
            product_id: 1,
            quantity,
            price: price.parse().unwrap(),
        }
    }

    #[test]
    fn line_total_is_quantity_times_unit_price() {
        assert_eq!(item(3, "5.00").line_total(), "15.00".parse().unwrap());
        assert_eq!(item(1, "19.99").line_total(), "19.99".parse().unwrap());
    }

    #[test]
    fn order_total_sums_line_items() {
        let items = [item(3, "5.00"), item(2, "1.25")];
        assert_eq!(order_total(&items), "17.50".parse().unwrap());
    }

    #[test]
    fn order_total_of_no_items_is_zero() {
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn minor_units_conversion() {
        assert_eq!(total_minor_units("15.00".parse().unwrap()), Some(1500));
        assert_eq!(total_minor_units("0.01".parse().unwrap()), Some(1));
        assert_eq!(total_minor_units("19.99".parse().unwrap()), Some(1999));
        assert_eq!(total_minor_units(Decimal::ZERO), Some(0));
    }

    #[test]
    fn minor_units_rejects_negative() {
        assert_eq!(total_minor_units("-1.00".parse().unwrap()), None);
    }

    #[test]
    fn paid_is_terminal() {
        let mut order = Order {
            id: 1,
            customer_name: "Ada".into(),
            email: "ada@example.com".into(),
            phone_number: "0123456789".into(),
            address: "1 Test Lane".into(),
            delivery_date: None,
            total: Decimal::ZERO,
            status: "Pending".into(),
            payment_method: "Card".into(),
            payment_status: "Pending".into(),
            stripe_payment_intent: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(!order.is_paid());
        assert_eq!(order.payment_state(), Some(PaymentStatus::Pending));

        order.payment_status = "Paid".into();
        assert!(order.is_paid());

        order.payment_status = "Failed".into();
        assert!(!order.is_paid());
        assert_eq!(order.payment_state(), Some(PaymentStatus::Failed));
    }

    #[test]
    fn status_db_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(OrderStatus::from_db("Voided"), None);
    }

    #[test]
    fn payment_status_db_roundtrip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(PaymentStatus::from_db("paid"), None);
    }

    #[test]
    fn payment_method_db_roundtrip() {
        assert_eq!(PaymentMethod::from_db("COD"), Some(PaymentMethod::Cod));
        assert_eq!(PaymentMethod::from_db("Card"), Some(PaymentMethod::Card));
        assert_eq!(
            PaymentMethod::from_db("Online"),
            Some(PaymentMethod::Online)
        );
        assert_eq!(PaymentMethod::from_db("Cheque"), None);
    }
}
