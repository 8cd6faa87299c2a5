//! Shared types for the Pluto shop backend
//!
//! Domain models, the unified error system, and response structures used
//! by the pluto-cloud server.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
