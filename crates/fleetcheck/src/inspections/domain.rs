use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{ItemKind, ValidationConfig};
use super::roles::{Role, DEFAULT_EDITABLE_ROLES};
use super::tuv::TuvStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleGroupId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChecklistId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TuvRecordId(pub i64);

/// Vehicle group owning checklists; executions never cross group boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleGroup {
    pub id: VehicleGroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub plate: String,
    pub group_id: VehicleGroupId,
}

/// A checklist or checklist template. Templates are never executed directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub name: String,
    pub group_id: VehicleGroupId,
    pub template: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ItemId,
    pub checklist_id: ChecklistId,
    pub description: String,
    /// `None` marks a legacy untyped item, which bypasses validation.
    pub item_type: Option<ItemKind>,
    pub validation_config: Option<ValidationConfig>,
    /// Empty set falls back to the kind's default editable roles.
    pub editable_roles: Vec<Role>,
    pub requires_tuv: bool,
    /// Nested field schema for composite kinds, opaque to the engine.
    pub subcategories: Option<Value>,
    pub mandatory: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl ChecklistItem {
    pub fn effective_editable_roles(&self) -> Vec<Role> {
        if !self.editable_roles.is_empty() {
            self.editable_roles.clone()
        } else {
            match self.item_type {
                Some(kind) => kind.default_editable_roles().to_vec(),
                None => DEFAULT_EDITABLE_ROLES.to_vec(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Started,
    Completed,
    Cancelled,
}

impl ExecutionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExecutionStatus::Started => "started",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

/// One run of a checklist against one vehicle. At most one `started`
/// execution may exist per (checklist, vehicle) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub checklist_id: ChecklistId,
    pub vehicle_id: VehicleId,
    pub started_by: UserId,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn is_active(&self) -> bool {
        self.status == ExecutionStatus::Started
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    #[default]
    Ok,
    Error,
    NotTestable,
}

impl ResultStatus {
    pub const ALL: [ResultStatus; 3] =
        [ResultStatus::Ok, ResultStatus::Error, ResultStatus::NotTestable];

    pub const fn label(self) -> &'static str {
        match self {
            ResultStatus::Ok => "ok",
            ResultStatus::Error => "error",
            ResultStatus::NotTestable => "not_testable",
        }
    }
}

/// Client-submitted result fields. Every field is optional; on update only
/// the fields present overwrite the stored result (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResultStatus>,
    /// Free-form value: scalar rating, percentage, composite record, or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuv_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Stored answer for one item within one execution; unique per
/// (execution, item) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: ResultId,
    pub execution_id: ExecutionId,
    pub item_id: ItemId,
    pub status: ResultStatus,
    pub value: Option<Value>,
    pub present: Option<bool>,
    pub tuv_date: Option<NaiveDate>,
    pub tuv_status: Option<TuvStatus>,
    pub quantity: Option<i64>,
    pub comment: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ItemResult {
    pub fn create(
        id: ResultId,
        execution_id: ExecutionId,
        item_id: ItemId,
        payload: &ResultPayload,
        tuv_status: Option<TuvStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            execution_id,
            item_id,
            status: payload.status.unwrap_or_default(),
            value: payload.value.clone(),
            present: payload.present,
            tuv_date: payload.tuv_date,
            tuv_status,
            quantity: payload.quantity,
            comment: payload.comment.clone(),
            recorded_at: now,
        }
    }

    /// Upsert merge: fields present in the payload overwrite, unset fields
    /// stay untouched.
    pub fn apply(&mut self, payload: &ResultPayload, tuv_status: Option<TuvStatus>) {
        if let Some(status) = payload.status {
            self.status = status;
        }
        if let Some(value) = &payload.value {
            self.value = Some(value.clone());
        }
        if let Some(present) = payload.present {
            self.present = Some(present);
        }
        if let Some(date) = payload.tuv_date {
            self.tuv_date = Some(date);
        }
        if tuv_status.is_some() {
            self.tuv_status = tuv_status;
        }
        if let Some(quantity) = payload.quantity {
            self.quantity = Some(quantity);
        }
        if let Some(comment) = &payload.comment {
            self.comment = Some(comment.clone());
        }
    }
}

/// Per-vehicle certification deadline; at most one per vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuvRecord {
    pub id: TuvRecordId,
    pub vehicle_id: VehicleId,
    pub expires_on: NaiveDate,
    pub last_inspection: Option<NaiveDate>,
    pub status: TuvStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChecklist {
    pub name: String,
    pub group_id: VehicleGroupId,
    pub template: bool,
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChecklistItem {
    pub checklist_id: ChecklistId,
    pub description: String,
    pub item_type: Option<ItemKind>,
    pub validation_config: Option<ValidationConfig>,
    pub editable_roles: Vec<Role>,
    pub requires_tuv: bool,
    pub subcategories: Option<Value>,
    pub mandatory: bool,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTuvRecord {
    pub vehicle_id: VehicleId,
    pub expires_on: NaiveDate,
    #[serde(default)]
    pub last_inspection: Option<NaiveDate>,
}

/// Wire-facing checklist creation request. Item kinds arrive as raw strings
/// and are parsed (and rejected when unknown) by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSpec {
    pub name: String,
    pub group_id: VehicleGroupId,
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub description: String,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub validation_config: Option<ValidationConfig>,
    #[serde(default)]
    pub editable_roles: Option<Vec<Role>>,
    #[serde(default)]
    pub requires_tuv: bool,
    #[serde(default)]
    pub subcategories: Option<Value>,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub position: Option<i32>,
}

/// Partial update for one checklist item definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub validation_config: Option<ValidationConfig>,
    #[serde(default)]
    pub editable_roles: Option<Vec<Role>>,
    #[serde(default)]
    pub requires_tuv: Option<bool>,
    #[serde(default)]
    pub subcategories: Option<Value>,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub position: Option<i32>,
}

/// Creation response pairing a checklist with its ordered items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistWithItems {
    pub checklist: Checklist,
    pub items: Vec<ChecklistItem>,
}
