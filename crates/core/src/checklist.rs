//! Checklist item response schemas.
//!
//! Each checklist item declares how it is answered. Responses are JSON
//! objects validated against that declaration before they are stored:
//!
//! | Kind      | Payload                                                |
//! |-----------|--------------------------------------------------------|
//! | `radio`   | `{"value": "<one of options>"}`                        |
//! | `text`    | `{"value": "<non-empty text>"}`                        |
//! | `numeric` | `{"value": <number within min..=max>}`                 |
//! | `photo`   | `{"url": "<uploaded ref>", "latitude"?, "longitude"?}` |
//!
//! Every kind also accepts an optional free-text `"remarks"` field.

use serde_json::Value;

use crate::error::CoreError;
use crate::geotag::validate_coordinates;
use crate::status::define_label_enum;

/// Maximum length of a text answer or remark.
pub const MAX_TEXT_LENGTH: usize = 5_000;

define_label_enum! {
    /// How a checklist item is answered.
    ResponseKind {
        Radio = "radio",
        Text = "text",
        Numeric = "numeric",
        Photo = "photo",
    }
}

/// The answering rules of one checklist item.
#[derive(Debug, Clone, Copy)]
pub struct ItemSchema<'a> {
    pub kind: ResponseKind,
    pub options: &'a [String],
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

/// Validate an item definition before it is stored.
pub fn validate_item_schema(schema: &ItemSchema<'_>) -> Result<(), CoreError> {
    match schema.kind {
        ResponseKind::Radio if schema.options.is_empty() => Err(CoreError::Validation(
            "A radio checklist item needs at least one option".to_string(),
        )),
        ResponseKind::Numeric => match (schema.min_value, schema.max_value) {
            (Some(min), Some(max)) if min > max => Err(CoreError::Validation(format!(
                "Numeric range is empty: min {min} > max {max}"
            ))),
            _ => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Validate a response payload against the item's schema.
pub fn validate_response(schema: &ItemSchema<'_>, payload: &Value) -> Result<(), CoreError> {
    let obj = payload.as_object().ok_or_else(|| {
        CoreError::Validation("Checklist response payload must be a JSON object".to_string())
    })?;

    if let Some(remarks) = obj.get("remarks") {
        let text = remarks.as_str().ok_or_else(|| {
            CoreError::Validation("'remarks' must be a string".to_string())
        })?;
        check_length("remarks", text)?;
    }

    match schema.kind {
        ResponseKind::Radio => {
            let value = required_str(obj.get("value"), "value")?;
            if !schema.options.iter().any(|o| o == value) {
                return Err(CoreError::Validation(format!(
                    "'{value}' is not an option. Must be one of: {}",
                    schema.options.join(", ")
                )));
            }
        }
        ResponseKind::Text => {
            let value = required_str(obj.get("value"), "value")?;
            check_length("value", value)?;
        }
        ResponseKind::Numeric => {
            let value = obj.get("value").and_then(Value::as_f64).ok_or_else(|| {
                CoreError::MissingPayload("numeric response requires a numeric 'value'".to_string())
            })?;
            if let Some(min) = schema.min_value {
                if value < min {
                    return Err(CoreError::Validation(format!(
                        "Value {value} is below the minimum {min}"
                    )));
                }
            }
            if let Some(max) = schema.max_value {
                if value > max {
                    return Err(CoreError::Validation(format!(
                        "Value {value} is above the maximum {max}"
                    )));
                }
            }
        }
        ResponseKind::Photo => {
            required_str(obj.get("url"), "url")?;
            let lat = obj.get("latitude").and_then(Value::as_f64);
            let lng = obj.get("longitude").and_then(Value::as_f64);
            match (lat, lng) {
                (Some(lat), Some(lng)) => validate_coordinates(lat, lng)?,
                (None, None) => {}
                _ => {
                    return Err(CoreError::Validation(
                        "Photo geotag needs both latitude and longitude".to_string(),
                    ))
                }
            }
        }
    }

    Ok(())
}

fn required_str<'v>(value: Option<&'v Value>, field: &str) -> Result<&'v str, CoreError> {
    match value.and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(CoreError::MissingPayload(format!(
            "response requires a non-empty '{field}'"
        ))),
    }
}

fn check_length(field: &str, text: &str) -> Result<(), CoreError> {
    if text.len() > MAX_TEXT_LENGTH {
        return Err(CoreError::Validation(format!(
            "'{field}' exceeds {MAX_TEXT_LENGTH} characters"
        )));
    }
    Ok(())
}
