//! Domain models

pub mod order;
pub mod product;

pub use order::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
pub use product::Product;
