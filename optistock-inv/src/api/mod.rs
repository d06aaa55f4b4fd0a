//! HTTP API handlers for optistock-inv
//!
//! Thin translation between JSON requests and `Inventory` operations.

pub mod health;
pub mod import;
pub mod lenses;
pub mod stats;

pub use health::health_routes;
pub use import::import_routes;
pub use lenses::lens_routes;
pub use stats::stats_routes;
