//! # OptiStock Common Library
//!
//! Shared code for the OptiStock lens inventory service:
//! - Optical value types and the lens Specification Key
//! - Lens records and their validated inputs
//! - Field validation and coercion of raw request values
//! - Configuration loading and root folder resolution
//! - Database initialization

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod lens;

pub use error::{Error, Result};
pub use lens::{
    Axis, BoxNumber, Diopters, LensEdit, LensRecord, NewLens, SpecKey, LOW_STOCK_THRESHOLD,
};
