//! Lens inventory domain types
//!
//! A lens is identified by its Specification Key: the optical tuple
//! (sph, cyl, axis, addition) together with the storage box it sits in.
//! Two records with equal keys are the same stock item.

pub mod key;
pub mod record;
pub mod validation;

pub use key::{Axis, BoxNumber, Diopters, LensFilter, SpecKey};
pub use record::{LensEdit, LensRecord, NewLens};
pub use validation::{FieldError, LensField, RawLensFields, ValidationErrors};

/// Quantities strictly below this value are low stock.
///
/// Shared by the adjustment advisory, the statistics counters and the
/// low-stock listing.
pub const LOW_STOCK_THRESHOLD: u32 = 4;

/// Whether a quantity should raise the low-stock advisory
pub fn is_low_stock(quantity: u32) -> bool {
    quantity < LOW_STOCK_THRESHOLD
}
