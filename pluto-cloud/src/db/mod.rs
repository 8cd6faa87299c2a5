//! Database access layer

pub mod orders;
pub mod products;
pub mod webhook_events;
