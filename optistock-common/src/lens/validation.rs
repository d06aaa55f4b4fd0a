//! Validation Rules for incoming lens fields
//!
//! Raw values arrive as loosely typed JSON (numbers, numeric strings, empty
//! strings, nulls). Coercion turns empty/null into "absent"; range checks only
//! ever fire on present values. Every field is checked and all failures are
//! reported together.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;

use super::key::{Axis, BoxNumber, Diopters, LensFilter, SpecKey};
use super::record::{LensEdit, NewLens};

// Checked against the value as sent, before rounding to hundredths
const SPH_RANGE: RangeInclusive<f64> = -20.0..=20.0;
const CYL_RANGE: RangeInclusive<f64> = -6.0..=6.0;
const ADDITION_RANGE: RangeInclusive<f64> = 0.75..=4.0;

const SPH_RANGE_MSG: &str = "SPH must be between -20.00 and +20.00";
const CYL_RANGE_MSG: &str = "CYL must be between -6.00 and +6.00";
const AXIS_MSG: &str = "Axis must be an integer between 0 and 180";
const ADDITION_RANGE_MSG: &str = "Addition must be between +0.75 and +4.00";
const BOX_REQUIRED_MSG: &str = "Box number is required";

/// Input field names, as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LensField {
    Sph,
    Cyl,
    Axis,
    Addition,
    BoxNumber,
    Quantity,
}

/// One violated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<LensField>,
    pub message: String,
}

/// Every rule a record (or request) violated, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A failure not tied to a single field
    pub fn general(message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field: None,
            message: message.into(),
        }])
    }

    pub fn push(&mut self, field: LensField, message: impl Into<String>) {
        self.0.push(FieldError {
            field: Some(field),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn reasons(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }

    pub fn has_field(&self, field: LensField) -> bool {
        self.0.iter().any(|e| e.field == Some(field))
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// Lens fields exactly as a client sent them
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLensFields {
    #[serde(default)]
    pub sph: Option<Value>,
    #[serde(default)]
    pub cyl: Option<Value>,
    #[serde(default)]
    pub axis: Option<Value>,
    #[serde(default)]
    pub addition: Option<Value>,
    #[serde(default)]
    pub box_number: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl RawLensFields {
    /// Validate for creation. Box number is required, quantity defaults to 0.
    pub fn validate_new(&self) -> Result<NewLens, ValidationErrors> {
        let (checked, mut errors) = self.check();
        let Some(box_number) = checked.box_number else {
            errors.push(LensField::BoxNumber, BOX_REQUIRED_MSG);
            return Err(errors);
        };
        errors.into_result(NewLens {
            key: SpecKey {
                sph: checked.sph,
                cyl: checked.cyl,
                axis: checked.axis,
                addition: checked.addition,
                box_number,
            },
            quantity: checked.quantity.unwrap_or(0),
        })
    }

    /// Validate an explicit edit. Box number and quantity may be omitted.
    pub fn validate_edit(&self) -> Result<LensEdit, ValidationErrors> {
        let (checked, errors) = self.check();
        errors.into_result(LensEdit {
            sph: checked.sph,
            cyl: checked.cyl,
            axis: checked.axis,
            addition: checked.addition,
            box_number: checked.box_number,
            quantity: checked.quantity,
        })
    }

    /// Parse search parameters. Values must be well formed but are not range checked.
    pub fn to_filter(&self) -> Result<LensFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let sph = collect(&mut errors, LensField::Sph, parse_diopters(&self.sph, "SPH"));
        let cyl = collect(&mut errors, LensField::Cyl, parse_diopters(&self.cyl, "CYL"));
        let addition = collect(
            &mut errors,
            LensField::Addition,
            parse_diopters(&self.addition, "Addition"),
        );
        let axis = match coerce_integer(&self.axis) {
            Ok(None) => None,
            Ok(Some(degrees)) => match u16::try_from(degrees) {
                Ok(degrees) => Some(Axis::unchecked(degrees)),
                Err(_) => {
                    errors.push(LensField::Axis, AXIS_MSG);
                    None
                }
            },
            Err(_) => {
                errors.push(LensField::Axis, AXIS_MSG);
                None
            }
        };
        let box_number = coerce_text(&self.box_number).and_then(|s| BoxNumber::parse(&s));

        errors.into_result(LensFilter {
            sph,
            cyl,
            axis,
            addition,
            box_number,
        })
    }

    fn check(&self) -> (Checked, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        let sph = collect(
            &mut errors,
            LensField::Sph,
            check_diopters(&self.sph, "SPH", &SPH_RANGE, SPH_RANGE_MSG),
        );
        let cyl = collect(
            &mut errors,
            LensField::Cyl,
            check_diopters(&self.cyl, "CYL", &CYL_RANGE, CYL_RANGE_MSG),
        );
        let axis = collect(&mut errors, LensField::Axis, check_axis(&self.axis));
        let addition = collect(
            &mut errors,
            LensField::Addition,
            check_diopters(&self.addition, "Addition", &ADDITION_RANGE, ADDITION_RANGE_MSG),
        );
        let box_number = coerce_text(&self.box_number).and_then(|s| BoxNumber::parse(&s));
        let quantity = collect(&mut errors, LensField::Quantity, check_quantity(&self.quantity));

        (
            Checked {
                sph,
                cyl,
                axis,
                addition,
                box_number,
                quantity,
            },
            errors,
        )
    }
}

struct Checked {
    sph: Option<Diopters>,
    cyl: Option<Diopters>,
    axis: Option<Axis>,
    addition: Option<Diopters>,
    box_number: Option<BoxNumber>,
    quantity: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoerceError {
    NotNumber,
    NotInteger,
}

fn collect<T>(
    errors: &mut ValidationErrors,
    field: LensField,
    result: Result<Option<T>, String>,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(message) => {
            errors.push(field, message);
            None
        }
    }
}

/// Empty strings and nulls are absent; numbers and numeric strings are parsed.
fn coerce_decimal(value: &Option<Value>) -> Result<Option<f64>, CoerceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or(CoerceError::NotNumber),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or(CoerceError::NotNumber)
        }
        Some(_) => Err(CoerceError::NotNumber),
    }
}

fn coerce_integer(value: &Option<Value>) -> Result<Option<i64>, CoerceError> {
    if let Some(Value::Number(n)) = value {
        if let Some(i) = n.as_i64() {
            return Ok(Some(i));
        }
    }
    if let Some(Value::String(s)) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Ok(Some(i));
        }
    }
    match coerce_decimal(value)? {
        None => Ok(None),
        // Spreadsheets hand over whole numbers as "10.0"
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(Some(v as i64)),
        Some(_) => Err(CoerceError::NotInteger),
    }
}

/// Box labels may arrive as numbers from spreadsheet cells.
fn coerce_text(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_diopters(value: &Option<Value>, label: &str) -> Result<Option<Diopters>, String> {
    let not_number = || format!("{} must be a number", label);
    match coerce_decimal(value) {
        Ok(None) => Ok(None),
        Ok(Some(v)) => Diopters::from_f64(v).map(Some).ok_or_else(not_number),
        Err(_) => Err(not_number()),
    }
}

fn check_diopters(
    value: &Option<Value>,
    label: &str,
    range: &RangeInclusive<f64>,
    range_msg: &str,
) -> Result<Option<Diopters>, String> {
    if let Ok(Some(v)) = coerce_decimal(value) {
        if !range.contains(&v) {
            return Err(range_msg.to_string());
        }
    }
    parse_diopters(value, label)
}

fn check_axis(value: &Option<Value>) -> Result<Option<Axis>, String> {
    match coerce_integer(value) {
        Ok(None) => Ok(None),
        Ok(Some(degrees)) => u16::try_from(degrees)
            .ok()
            .and_then(Axis::new)
            .map(Some)
            .ok_or_else(|| AXIS_MSG.to_string()),
        Err(_) => Err(AXIS_MSG.to_string()),
    }
}

fn check_quantity(value: &Option<Value>) -> Result<Option<u32>, String> {
    match coerce_integer(value) {
        Ok(None) => Ok(None),
        Ok(Some(q)) if q < 0 => Err("Quantity cannot be negative".to_string()),
        Ok(Some(q)) => u32::try_from(q)
            .map(Some)
            .map_err(|_| "Quantity exceeds maximum".to_string()),
        Err(CoerceError::NotInteger) => Err("Quantity must be a whole number".to_string()),
        Err(CoerceError::NotNumber) => Err("Quantity must be a number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawLensFields {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_record_defaults_quantity_to_zero() {
        let lens = raw(json!({ "boxNumber": "A1" })).validate_new().unwrap();
        assert_eq!(lens.key, SpecKey::in_box(BoxNumber::parse("A1").unwrap()));
        assert_eq!(lens.quantity, 0);
    }

    #[test]
    fn test_empty_strings_and_nulls_are_absent() {
        let lens = raw(json!({
            "boxNumber": "A1",
            "sph": "",
            "cyl": null,
            "axis": "  ",
            "addition": "",
            "quantity": 3
        }))
        .validate_new()
        .unwrap();

        assert_eq!(lens.key.sph, None);
        assert_eq!(lens.key.cyl, None);
        assert_eq!(lens.key.axis, None);
        assert_eq!(lens.key.addition, None);
        assert_eq!(lens.quantity, 3);
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        let lens = raw(json!({
            "boxNumber": " B2 ",
            "sph": "+1.50",
            "cyl": "-0.75",
            "axis": "180",
            "addition": "2.00",
            "quantity": "8"
        }))
        .validate_new()
        .unwrap();

        assert_eq!(lens.key.box_number.as_str(), "B2");
        assert_eq!(lens.key.sph, Some(Diopters::from_hundredths(150)));
        assert_eq!(lens.key.cyl, Some(Diopters::from_hundredths(-75)));
        assert_eq!(lens.key.axis, Axis::new(180));
        assert_eq!(lens.key.addition, Some(Diopters::from_hundredths(200)));
        assert_eq!(lens.quantity, 8);
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        let ok = raw(json!({
            "boxNumber": "A1",
            "sph": -20,
            "cyl": 6,
            "axis": 0,
            "addition": 0.75,
            "quantity": 0
        }));
        assert!(ok.validate_new().is_ok());

        let ok = raw(json!({ "boxNumber": "A1", "sph": 20, "cyl": -6, "axis": 180, "addition": 4 }));
        assert!(ok.validate_new().is_ok());
    }

    #[test]
    fn test_values_just_outside_a_range_are_not_rounded_in() {
        let cases = [
            (json!({ "sph": 20.004 }), LensField::Sph),
            (json!({ "sph": "-20.001" }), LensField::Sph),
            (json!({ "cyl": -6.001 }), LensField::Cyl),
            (json!({ "cyl": "6.004" }), LensField::Cyl),
            (json!({ "addition": 0.749 }), LensField::Addition),
            (json!({ "addition": 0.745 }), LensField::Addition),
            (json!({ "addition": 4.001 }), LensField::Addition),
        ];
        for (mut fields, field) in cases {
            fields["boxNumber"] = json!("A1");
            let errors = raw(fields.clone()).validate_new().unwrap_err();
            assert!(errors.has_field(field), "{} should be rejected", fields);

            let errors = raw(fields).validate_edit().unwrap_err();
            assert!(errors.has_field(field));
        }

        // The exact boundaries, sent as strings, are still inside
        let ok = raw(json!({ "boxNumber": "A1", "sph": "+20.00", "cyl": "-6.00", "addition": "0.75" }))
            .validate_new()
            .unwrap();
        assert_eq!(ok.key.sph, Some(Diopters::from_hundredths(2000)));
        assert_eq!(ok.key.addition, Some(Diopters::from_hundredths(75)));
    }

    #[test]
    fn test_all_field_errors_are_collected() {
        let errors = raw(json!({
            "boxNumber": "   ",
            "sph": 20.25,
            "cyl": -6.25,
            "axis": 181,
            "addition": 0.5,
            "quantity": -1
        }))
        .validate_new()
        .unwrap_err();

        assert_eq!(
            errors.reasons(),
            vec![
                "SPH must be between -20.00 and +20.00",
                "CYL must be between -6.00 and +6.00",
                "Axis must be an integer between 0 and 180",
                "Addition must be between +0.75 and +4.00",
                "Quantity cannot be negative",
                "Box number is required",
            ]
        );
        assert!(errors.to_string().starts_with("SPH must be between -20.00 and +20.00, CYL"));
    }

    #[test]
    fn test_non_numeric_values_are_rejected() {
        let errors = raw(json!({ "boxNumber": "A1", "sph": "abc", "quantity": "many" }))
            .validate_new()
            .unwrap_err();
        assert!(errors.has_field(LensField::Sph));
        assert!(errors.has_field(LensField::Quantity));
        assert_eq!(errors.reasons()[0], "SPH must be a number");
    }

    #[test]
    fn test_fractional_axis_and_quantity_are_rejected() {
        let errors = raw(json!({ "boxNumber": "A1", "axis": "90.5", "quantity": 2.5 }))
            .validate_new()
            .unwrap_err();
        assert_eq!(
            errors.reasons(),
            vec![
                "Axis must be an integer between 0 and 180",
                "Quantity must be a whole number"
            ]
        );
    }

    #[test]
    fn test_whole_number_floats_are_integers() {
        let lens = raw(json!({ "boxNumber": "A1", "axis": 90.0, "quantity": "10.0" }))
            .validate_new()
            .unwrap();
        assert_eq!(lens.key.axis, Axis::new(90));
        assert_eq!(lens.quantity, 10);
    }

    #[test]
    fn test_numeric_box_number_is_accepted() {
        let lens = raw(json!({ "boxNumber": 12, "quantity": 1 })).validate_new().unwrap();
        assert_eq!(lens.key.box_number.as_str(), "12");
    }

    #[test]
    fn test_edit_allows_missing_box_and_quantity() {
        let edit = raw(json!({ "sph": -1.25 })).validate_edit().unwrap();
        assert_eq!(edit.sph, Some(Diopters::from_hundredths(-125)));
        assert_eq!(edit.box_number, None);
        assert_eq!(edit.quantity, None);
    }

    #[test]
    fn test_edit_still_checks_ranges() {
        let errors = raw(json!({ "quantity": -3, "axis": 200 }))
            .validate_edit()
            .unwrap_err();
        assert!(errors.has_field(LensField::Axis));
        assert!(errors.has_field(LensField::Quantity));
    }

    #[test]
    fn test_filter_parses_without_range_checks() {
        let filter = raw(json!({ "sph": "-25", "axis": "190", "boxNumber": "C3" }))
            .to_filter()
            .unwrap();
        assert_eq!(filter.sph, Some(Diopters::from_hundredths(-2500)));
        assert_eq!(filter.axis.map(Axis::degrees), Some(190));
        assert_eq!(filter.box_number, BoxNumber::parse("C3"));
        assert_eq!(filter.cyl, None);
    }

    #[test]
    fn test_filter_rejects_garbage() {
        let errors = raw(json!({ "cyl": "x" })).to_filter().unwrap_err();
        assert_eq!(errors.reasons(), vec!["CYL must be a number"]);
    }

    #[test]
    fn test_general_error_has_no_field() {
        let errors = ValidationErrors::general("No valid lenses to import");
        let json = serde_json::to_value(errors.errors()).unwrap();
        assert_eq!(json[0]["message"], "No valid lenses to import");
        assert!(json[0].get("field").is_none());
    }
}
