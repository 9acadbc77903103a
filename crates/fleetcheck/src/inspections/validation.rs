use chrono::NaiveDate;
use serde_json::Value;

use super::catalog::ItemKind;
use super::domain::{ChecklistItem, ResultPayload, ResultStatus};

/// Rejection reasons surfaced to clients. Coercion failures
/// ([`ValidationError::NotNumeric`]) are deliberately distinct from range
/// violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a number")]
    NotNumeric { field: &'static str },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },
    #[error("required field missing: {0}")]
    MissingField(String),
    #[error("value must be a structured apparatus record")]
    MalformedComposite,
    #[error("certification date {0} has already passed")]
    CertificationExpired(NaiveDate),
    #[error("status must be one of: {}", allowed_labels(.allowed))]
    StatusNotAllowed { allowed: Vec<ResultStatus> },
    #[error("vehicle data is read-only and cannot be edited")]
    ReadOnly,
    #[error("presence must be recorded for this item")]
    PresenceRequired,
    #[error("unknown item type: {0}")]
    UnknownItemKind(String),
}

fn allowed_labels(allowed: &[ResultStatus]) -> String {
    allowed
        .iter()
        .map(|status| status.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a proposed result against the item's kind and merged rule set.
///
/// Pure: no side effects, the clock arrives as `today`. Items without a
/// kind accept unconditionally; they predate typed validation and keeping
/// them writable is an explicit compatibility policy.
pub fn validate(
    item: &ChecklistItem,
    payload: &ResultPayload,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    let Some(kind) = item.item_type else {
        return Ok(());
    };
    let config = kind.effective_config(item.validation_config.as_ref());

    match kind {
        // Unconditional, regardless of configuration or caller role.
        ItemKind::VehicleInfo => Err(ValidationError::ReadOnly),
        ItemKind::Rating => {
            if let Some(value) = &payload.value {
                let rating =
                    as_integer(value).ok_or(ValidationError::NotNumeric { field: "value" })?;
                let min = config.min_value.unwrap_or(1);
                let max = config.max_value.unwrap_or(6);
                if rating < min || rating > max {
                    return Err(ValidationError::OutOfRange {
                        field: "value",
                        min,
                        max,
                    });
                }
            }
            Ok(())
        }
        ItemKind::Percentage => {
            if let Some(value) = &payload.value {
                let percentage = value
                    .as_f64()
                    .ok_or(ValidationError::NotNumeric { field: "value" })?;
                let min = config.min_value.unwrap_or(0);
                let max = config.max_value.unwrap_or(100);
                if percentage < min as f64 || percentage > max as f64 {
                    return Err(ValidationError::OutOfRange {
                        field: "value",
                        min,
                        max,
                    });
                }
            }
            Ok(())
        }
        ItemKind::Atemschutz => {
            if let Some(value) = &payload.value {
                let record = value
                    .as_object()
                    .ok_or(ValidationError::MalformedComposite)?;
                for field in config.required_fields.iter().flatten() {
                    if !record.contains_key(field) {
                        return Err(ValidationError::MissingField(field.clone()));
                    }
                }
            }
            Ok(())
        }
        ItemKind::Standard => {
            let requires_presence = config
                .required_fields
                .iter()
                .flatten()
                .any(|field| field == "present");
            if requires_presence && payload.present.is_none() {
                return Err(ValidationError::PresenceRequired);
            }
            Ok(())
        }
        ItemKind::Quantity => {
            if let Some(quantity) = payload.quantity {
                let min = config.min_value.unwrap_or(0);
                let max = config.max_value.unwrap_or(999);
                if quantity < min || quantity > max {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity",
                        min,
                        max,
                    });
                }
            }
            Ok(())
        }
        ItemKind::DateCheck => {
            if config.required.unwrap_or(true) {
                if let Some(date) = payload.tuv_date {
                    if date < today {
                        return Err(ValidationError::CertificationExpired(date));
                    }
                }
            }
            Ok(())
        }
        ItemKind::StatusCheck => {
            if let Some(status) = payload.status {
                let allowed = config
                    .allowed_values
                    .unwrap_or_else(|| ResultStatus::ALL.to_vec());
                if !allowed.contains(&status) {
                    return Err(ValidationError::StatusNotAllowed { allowed });
                }
            }
            Ok(())
        }
    }
}

/// JSON numbers only; whole-valued floats count, strings never coerce.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0)
                .map(|float| float as i64)
        }),
        _ => None,
    }
}
