use serde::{Deserialize, Serialize};

use super::domain::ResultStatus;
use super::roles::{Role, DEFAULT_EDITABLE_ROLES};

/// The eight checklist item kinds. Every typed item carries one of these;
/// items without a kind are legacy entries that bypass validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Read-only vehicle identification data.
    #[serde(rename = "vehicle_info")]
    VehicleInfo,
    /// Storage compartment quality rating, 1 (poor) to 6 (excellent).
    #[serde(rename = "rating_1_6")]
    Rating,
    /// Fuel level and similar 0-100% readings.
    #[serde(rename = "percentage")]
    Percentage,
    /// Composite breathing apparatus record with certified sub-fields.
    #[serde(rename = "atemschutz")]
    Atemschutz,
    /// Presence flag plus TÜV status, the most common equipment item.
    #[serde(rename = "standard")]
    Standard,
    /// Equipment counts ("7x").
    #[serde(rename = "quantity")]
    Quantity,
    /// TÜV expiration date checks.
    #[serde(rename = "date_check")]
    DateCheck,
    /// Plain ok / error / not testable status.
    #[serde(rename = "status_check")]
    StatusCheck,
}

/// Shape of the input a client renders for an item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    ReadOnly,
    Rating,
    Percentage,
    Composite,
    Presence,
    Count,
    Date,
    Select,
}

/// Introspection record for one item kind, consumed by form-rendering
/// callers via `list_item_types`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemTypeDescriptor {
    pub kind: ItemKind,
    pub label: &'static str,
    pub description: &'static str,
    pub editable: bool,
    pub input_shape: InputShape,
}

/// Closed validation rule parameters. Each kind reads the subset of fields
/// it understands; explicit item configuration overlays the kind defaults
/// field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<ResultStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl ValidationConfig {
    /// Field-by-field overlay; explicit values win, unset fields fall back
    /// to `defaults`.
    pub fn overlay(explicit: Option<&ValidationConfig>, defaults: ValidationConfig) -> Self {
        match explicit {
            None => defaults,
            Some(config) => ValidationConfig {
                min_value: config.min_value.or(defaults.min_value),
                max_value: config.max_value.or(defaults.max_value),
                required_fields: config
                    .required_fields
                    .clone()
                    .or(defaults.required_fields),
                allowed_values: config.allowed_values.clone().or(defaults.allowed_values),
                required: config.required.or(defaults.required),
            },
        }
    }
}

impl ItemKind {
    pub const ALL: [ItemKind; 8] = [
        ItemKind::VehicleInfo,
        ItemKind::Rating,
        ItemKind::Percentage,
        ItemKind::Atemschutz,
        ItemKind::Standard,
        ItemKind::Quantity,
        ItemKind::DateCheck,
        ItemKind::StatusCheck,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ItemKind::VehicleInfo => "vehicle_info",
            ItemKind::Rating => "rating_1_6",
            ItemKind::Percentage => "percentage",
            ItemKind::Atemschutz => "atemschutz",
            ItemKind::Standard => "standard",
            ItemKind::Quantity => "quantity",
            ItemKind::DateCheck => "date_check",
            ItemKind::StatusCheck => "status_check",
        }
    }

    /// Unknown kind strings are rejected by callers, never coerced.
    pub fn parse(raw: &str) -> Option<ItemKind> {
        ItemKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw.trim())
    }

    pub fn descriptor(self) -> ItemTypeDescriptor {
        match self {
            ItemKind::VehicleInfo => ItemTypeDescriptor {
                kind: self,
                label: "Vehicle data",
                description: "Read-only vehicle identification",
                editable: false,
                input_shape: InputShape::ReadOnly,
            },
            ItemKind::Rating => ItemTypeDescriptor {
                kind: self,
                label: "Rating (1-6)",
                description: "Compartment rating from 1 (poor) to 6 (excellent)",
                editable: true,
                input_shape: InputShape::Rating,
            },
            ItemKind::Percentage => ItemTypeDescriptor {
                kind: self,
                label: "Percentage",
                description: "Fuel level or similar 0-100% readings",
                editable: true,
                input_shape: InputShape::Percentage,
            },
            ItemKind::Atemschutz => ItemTypeDescriptor {
                kind: self,
                label: "Breathing apparatus",
                description: "Composite apparatus check with certification dates",
                editable: true,
                input_shape: InputShape::Composite,
            },
            ItemKind::Standard => ItemTypeDescriptor {
                kind: self,
                label: "Standard",
                description: "Presence check with TÜV status",
                editable: true,
                input_shape: InputShape::Presence,
            },
            ItemKind::Quantity => ItemTypeDescriptor {
                kind: self,
                label: "Quantity",
                description: "Equipment piece count",
                editable: true,
                input_shape: InputShape::Count,
            },
            ItemKind::DateCheck => ItemTypeDescriptor {
                kind: self,
                label: "TÜV date",
                description: "Certification expiration date check",
                editable: true,
                input_shape: InputShape::Date,
            },
            ItemKind::StatusCheck => ItemTypeDescriptor {
                kind: self,
                label: "Status",
                description: "Plain ok / error / not testable check",
                editable: true,
                input_shape: InputShape::Select,
            },
        }
    }

    pub fn default_config(self) -> ValidationConfig {
        match self {
            ItemKind::VehicleInfo => ValidationConfig::default(),
            ItemKind::Rating => ValidationConfig {
                min_value: Some(1),
                max_value: Some(6),
                ..ValidationConfig::default()
            },
            ItemKind::Percentage => ValidationConfig {
                min_value: Some(0),
                max_value: Some(100),
                ..ValidationConfig::default()
            },
            ItemKind::Atemschutz => ValidationConfig {
                required_fields: Some(vec![
                    "tuv_plate".to_string(),
                    "tuv_hood".to_string(),
                    "pa_units".to_string(),
                ]),
                ..ValidationConfig::default()
            },
            ItemKind::Standard => ValidationConfig {
                required_fields: Some(vec!["present".to_string(), "tuv_status".to_string()]),
                allowed_values: Some(ResultStatus::ALL.to_vec()),
                ..ValidationConfig::default()
            },
            ItemKind::Quantity => ValidationConfig {
                min_value: Some(0),
                max_value: Some(999),
                ..ValidationConfig::default()
            },
            ItemKind::DateCheck => ValidationConfig {
                required: Some(true),
                ..ValidationConfig::default()
            },
            ItemKind::StatusCheck => ValidationConfig {
                allowed_values: Some(ResultStatus::ALL.to_vec()),
                ..ValidationConfig::default()
            },
        }
    }

    /// Merged rule set for an item: explicit configuration over defaults.
    pub fn effective_config(self, explicit: Option<&ValidationConfig>) -> ValidationConfig {
        ValidationConfig::overlay(explicit, self.default_config())
    }

    /// Vehicle data may only be edited by administrators; every other kind
    /// uses the shared default.
    pub fn default_editable_roles(self) -> &'static [Role] {
        match self {
            ItemKind::VehicleInfo => &[Role::Admin],
            _ => &DEFAULT_EDITABLE_ROLES,
        }
    }
}

/// The full registry, in display order.
pub fn item_type_catalog() -> Vec<ItemTypeDescriptor> {
    ItemKind::ALL.into_iter().map(ItemKind::descriptor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_round_trip() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::parse("unknown_kind"), None);
    }

    #[test]
    fn only_vehicle_info_is_read_only() {
        for descriptor in item_type_catalog() {
            assert_eq!(
                descriptor.editable,
                descriptor.kind != ItemKind::VehicleInfo,
                "{}",
                descriptor.label
            );
        }
    }

    #[test]
    fn rating_defaults_span_one_to_six() {
        let config = ItemKind::Rating.default_config();
        assert_eq!(config.min_value, Some(1));
        assert_eq!(config.max_value, Some(6));
    }

    #[test]
    fn explicit_config_overlays_defaults() {
        let explicit = ValidationConfig {
            max_value: Some(4),
            ..ValidationConfig::default()
        };
        let merged = ItemKind::Rating.effective_config(Some(&explicit));
        assert_eq!(merged.min_value, Some(1));
        assert_eq!(merged.max_value, Some(4));
    }

    #[test]
    fn vehicle_info_editable_only_by_admins() {
        assert_eq!(ItemKind::VehicleInfo.default_editable_roles(), &[Role::Admin]);
        assert_eq!(
            ItemKind::Standard.default_editable_roles(),
            &DEFAULT_EDITABLE_ROLES
        );
    }
}
