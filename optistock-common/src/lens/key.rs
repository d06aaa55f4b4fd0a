//! Optical value types and the Specification Key

use serde::{Serialize, Serializer};
use std::fmt;

/// Dioptric power held as whole hundredths of a diopter.
///
/// Lens powers come in quarter-diopter steps, so hundredths are exact and
/// two keys built from `-2.25` and `"-2.250"` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Diopters(i32);

impl Diopters {
    pub const fn from_hundredths(hundredths: i32) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(self) -> i32 {
        self.0
    }

    /// Round a decimal power to the nearest hundredth.
    ///
    /// Returns `None` for NaN, infinities and values that do not fit.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * 100.0).round();
        if scaled.abs() > f64::from(i32::MAX) {
            return None;
        }
        Some(Self(scaled as i32))
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Diopters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Diopters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Cylinder axis in whole degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Axis(u16);

impl Axis {
    pub const MAX_DEGREES: u16 = 180;

    /// Build an axis, rejecting anything outside 0..=180 degrees.
    pub fn new(degrees: u16) -> Option<Self> {
        (degrees <= Self::MAX_DEGREES).then_some(Self(degrees))
    }

    /// Build an axis without the range check (search filters only).
    pub(crate) fn unchecked(degrees: u16) -> Self {
        Self(degrees)
    }

    pub const fn degrees(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage box label, trimmed and never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BoxNumber(String);

impl BoxNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoxNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optical identity of a stock item.
///
/// Every optical field is optional. Equality is field-wise on `Option`, so an
/// absent value matches only another absent value and never a present one.
/// The box number is part of the identity: the same optics stored in two
/// boxes are two distinct items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecKey {
    pub sph: Option<Diopters>,
    pub cyl: Option<Diopters>,
    pub axis: Option<Axis>,
    pub addition: Option<Diopters>,
    pub box_number: BoxNumber,
}

impl SpecKey {
    /// Key with no optical values, only a box
    pub fn in_box(box_number: BoxNumber) -> Self {
        Self {
            sph: None,
            cyl: None,
            axis: None,
            addition: None,
            box_number,
        }
    }
}

impl fmt::Display for SpecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string)
        }
        write!(
            f,
            "box {} sph {} cyl {} axis {} add {}",
            self.box_number,
            opt(&self.sph),
            opt(&self.cyl),
            opt(&self.axis),
            opt(&self.addition)
        )
    }
}

/// Partial key used for searches.
///
/// Only the fields that are set take part in matching; each set field must
/// equal the record's value exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LensFilter {
    pub sph: Option<Diopters>,
    pub cyl: Option<Diopters>,
    pub axis: Option<Axis>,
    pub addition: Option<Diopters>,
    pub box_number: Option<BoxNumber>,
}

impl LensFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, key: &SpecKey) -> bool {
        fn field<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
            match wanted {
                Some(value) => actual.as_ref() == Some(value),
                None => true,
            }
        }
        field(&self.sph, &key.sph)
            && field(&self.cyl, &key.cyl)
            && field(&self.axis, &key.axis)
            && field(&self.addition, &key.addition)
            && self
                .box_number
                .as_ref()
                .map_or(true, |b| b == &key.box_number)
    }
}
