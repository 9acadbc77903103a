use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::catalog::{item_type_catalog, ItemKind, ItemTypeDescriptor, ValidationConfig};
use super::domain::{
    ChecklistId, ChecklistItem, ChecklistSpec, ChecklistWithItems, Execution, ExecutionId,
    ExecutionStatus, ItemId, ItemPatch, ItemResult, ItemSpec, NewChecklist, NewChecklistItem,
    NewTuvRecord, ResultPayload, TuvRecord, VehicleId,
};
use super::repository::{InspectionStore, StartAttempt, StoreError};
use super::roles::{ActingUser, Role};
use super::tuv::{classify, days_remaining, TuvAlert, TuvAlerts};
use super::validation::{validate, ValidationError};

/// Time collaborator. Production uses [`SystemClock`]; tests pin a date.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Failure taxonomy for every engine operation. All four domain outcomes
/// are value-level; only `Store` marks a collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn not_found(what: &str) -> InspectionError {
    InspectionError::NotFound(what.to_string())
}

/// Validation introspection for one item, used by clients to render forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemValidationInfo {
    pub item_type: Option<ItemKind>,
    pub validation_config: ValidationConfig,
    pub requires_tuv: bool,
    pub subcategories: Option<Value>,
    pub editable_by_current_user: bool,
    pub editable_roles: Vec<Role>,
}

/// Service facade over the execution state machine, item administration,
/// and TÜV deadline upkeep.
pub struct InspectionService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: InspectionStore> InspectionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Start a new inspection run; a still-active run for the same pair is
    /// a conflict on this path.
    pub fn start_execution(
        &self,
        checklist_id: ChecklistId,
        vehicle_id: VehicleId,
        user: &ActingUser,
    ) -> Result<Execution, InspectionError> {
        match self.begin_execution(checklist_id, vehicle_id, user)? {
            StartAttempt::Created(execution) => Ok(execution),
            StartAttempt::AlreadyActive(id) => Err(InspectionError::Conflict(format!(
                "an execution is already active for this checklist and vehicle (execution {})",
                id.0
            ))),
        }
    }

    /// Shared entry for the HTTP path and the idempotent sync replay path:
    /// resolves references, forbids cross-group and template runs, then
    /// delegates the uniqueness check to the store's atomic start.
    pub fn begin_execution(
        &self,
        checklist_id: ChecklistId,
        vehicle_id: VehicleId,
        user: &ActingUser,
    ) -> Result<StartAttempt, InspectionError> {
        let checklist = self
            .store
            .checklist(checklist_id)?
            .ok_or_else(|| not_found("checklist"))?;
        if checklist.template {
            return Err(InspectionError::Conflict(
                "template checklists cannot be executed directly".to_string(),
            ));
        }
        let vehicle = self
            .store
            .vehicle(vehicle_id)?
            .ok_or_else(|| not_found("vehicle"))?;
        // A checklist is only visible to vehicles of its own group.
        if checklist.group_id != vehicle.group_id {
            return Err(not_found("checklist for this vehicle group"));
        }

        let attempt =
            self.store
                .start_execution(checklist_id, vehicle_id, user.id, self.clock.now())?;
        if let StartAttempt::Created(execution) = &attempt {
            info!(
                execution = execution.id.0,
                checklist = checklist_id.0,
                vehicle = vehicle_id.0,
                "inspection run started"
            );
        }
        Ok(attempt)
    }

    /// Record or overwrite the result for one item of an active run.
    pub fn record_result(
        &self,
        execution_id: ExecutionId,
        item_id: ItemId,
        payload: ResultPayload,
        user: &ActingUser,
    ) -> Result<ItemResult, InspectionError> {
        let execution = self
            .store
            .execution(execution_id)?
            .ok_or_else(|| not_found("execution"))?;
        if !execution.is_active() {
            return Err(InspectionError::Conflict(
                "execution is no longer active".to_string(),
            ));
        }
        if !user.may_manage_execution(execution.started_by) {
            return Err(InspectionError::Forbidden(
                "only the performing user or an organizer may record results".to_string(),
            ));
        }
        let item = self
            .store
            .item(item_id)?
            .filter(|item| item.checklist_id == execution.checklist_id)
            .ok_or_else(|| not_found("checklist item in this execution's checklist"))?;

        let today = self.clock.today();
        validate(&item, &payload, today)?;

        let tuv_status = payload.tuv_date.map(|date| classify(date, today));
        let result =
            self.store
                .upsert_result(execution_id, item_id, &payload, tuv_status, self.clock.now())?;
        debug!(
            execution = execution_id.0,
            item = item_id.0,
            status = result.status.label(),
            "item result recorded"
        );
        Ok(result)
    }

    pub fn complete_execution(
        &self,
        execution_id: ExecutionId,
        user: &ActingUser,
    ) -> Result<Execution, InspectionError> {
        let execution = self.finish_execution(execution_id, user, ExecutionStatus::Completed)?;
        info!(execution = execution_id.0, "inspection run completed");
        Ok(execution)
    }

    pub fn cancel_execution(
        &self,
        execution_id: ExecutionId,
        user: &ActingUser,
    ) -> Result<Execution, InspectionError> {
        let execution = self.finish_execution(execution_id, user, ExecutionStatus::Cancelled)?;
        info!(execution = execution_id.0, "inspection run cancelled");
        Ok(execution)
    }

    fn finish_execution(
        &self,
        execution_id: ExecutionId,
        user: &ActingUser,
        terminal: ExecutionStatus,
    ) -> Result<Execution, InspectionError> {
        let mut execution = self
            .store
            .execution(execution_id)?
            .ok_or_else(|| not_found("execution"))?;
        if !execution.is_active() {
            return Err(InspectionError::Conflict(
                "execution is no longer active".to_string(),
            ));
        }
        if !user.may_manage_execution(execution.started_by) {
            return Err(InspectionError::Forbidden(
                "only the performing user or an organizer may close this execution".to_string(),
            ));
        }
        execution.status = terminal;
        execution.completed_at = match terminal {
            ExecutionStatus::Completed => Some(self.clock.now()),
            _ => None,
        };
        self.store.update_execution(&execution)?;
        Ok(execution)
    }

    /// Create a checklist (or template) with its items in one call.
    pub fn create_checklist(
        &self,
        spec: ChecklistSpec,
        user: &ActingUser,
    ) -> Result<ChecklistWithItems, InspectionError> {
        if !user.role.has_level(Role::Organizer) {
            return Err(InspectionError::Forbidden(
                "only organizers or admins may create checklists".to_string(),
            ));
        }
        self.store
            .vehicle_group(spec.group_id)?
            .ok_or_else(|| not_found("vehicle group"))?;

        // Parse every kind up front so a bad item leaves nothing behind.
        let kinds = spec
            .items
            .iter()
            .map(|item| parse_kind(item.item_type.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        let now = self.clock.now();
        let checklist = self.store.insert_checklist(
            NewChecklist {
                name: spec.name.clone(),
                group_id: spec.group_id,
                template: spec.template,
                created_by: Some(user.id),
            },
            now,
        )?;

        let mut items = Vec::with_capacity(spec.items.len());
        for (index, (item_spec, kind)) in spec.items.iter().zip(kinds).enumerate() {
            items.push(self.store.insert_item(
                item_draft(checklist.id, item_spec, kind, index),
                now,
            )?);
        }

        info!(
            checklist = checklist.id.0,
            template = checklist.template,
            items = items.len(),
            "checklist created"
        );
        Ok(ChecklistWithItems { checklist, items })
    }

    /// Update one item's definition, gated by the item's editable roles.
    pub fn update_item(
        &self,
        item_id: ItemId,
        patch: ItemPatch,
        user: &ActingUser,
    ) -> Result<ChecklistItem, InspectionError> {
        if !user.role.has_level(Role::Organizer) {
            return Err(InspectionError::Forbidden(
                "only organizers or admins may edit checklist items".to_string(),
            ));
        }
        let mut item = self
            .store
            .item(item_id)?
            .ok_or_else(|| not_found("checklist item"))?;

        let allowed = item.effective_editable_roles();
        if !user.role.can_edit(&allowed) {
            let roles = allowed
                .iter()
                .map(|role| role.label())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(InspectionError::Forbidden(format!(
                "only these roles may edit this item: {roles}"
            )));
        }

        if let Some(raw) = &patch.item_type {
            item.item_type = parse_kind(Some(raw))?;
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(config) = patch.validation_config {
            item.validation_config = Some(config);
        }
        if let Some(roles) = patch.editable_roles {
            item.editable_roles = roles;
        }
        if let Some(requires_tuv) = patch.requires_tuv {
            item.requires_tuv = requires_tuv;
        }
        if let Some(subcategories) = patch.subcategories {
            item.subcategories = Some(subcategories);
        }
        if let Some(mandatory) = patch.mandatory {
            item.mandatory = mandatory;
        }
        if let Some(position) = patch.position {
            item.position = position;
        }

        self.store.update_item(&item)?;
        Ok(item)
    }

    pub fn checklist_items(
        &self,
        checklist_id: ChecklistId,
    ) -> Result<Vec<ChecklistItem>, InspectionError> {
        self.store
            .checklist(checklist_id)?
            .ok_or_else(|| not_found("checklist"))?;
        Ok(self.store.items_for_checklist(checklist_id)?)
    }

    pub fn item_validation_info(
        &self,
        item_id: ItemId,
        user: &ActingUser,
    ) -> Result<ItemValidationInfo, InspectionError> {
        let item = self
            .store
            .item(item_id)?
            .ok_or_else(|| not_found("checklist item"))?;
        let editable_roles = item.effective_editable_roles();
        let validation_config = match item.item_type {
            Some(kind) => kind.effective_config(item.validation_config.as_ref()),
            None => item.validation_config.clone().unwrap_or_default(),
        };
        Ok(ItemValidationInfo {
            item_type: item.item_type,
            validation_config,
            requires_tuv: item.requires_tuv,
            subcategories: item.subcategories.clone(),
            editable_by_current_user: user.role.can_edit(&editable_roles),
            editable_roles,
        })
    }

    /// Static item-type registry, for form rendering.
    pub fn list_item_types(&self) -> Vec<ItemTypeDescriptor> {
        item_type_catalog()
    }

    /// Create or replace a vehicle's TÜV deadline, stamping the derived
    /// status at write time.
    pub fn upsert_tuv_record(
        &self,
        draft: NewTuvRecord,
        user: &ActingUser,
    ) -> Result<TuvRecord, InspectionError> {
        if !user.role.has_level(Role::Organizer) {
            return Err(InspectionError::Forbidden(
                "only organizers or admins may manage TÜV deadlines".to_string(),
            ));
        }
        self.store
            .vehicle(draft.vehicle_id)?
            .ok_or_else(|| not_found("vehicle"))?;
        let status = classify(draft.expires_on, self.clock.today());
        Ok(self
            .store
            .upsert_tuv_record(draft, status, self.clock.now())?)
    }

    /// All deadlines, statuses re-derived and re-stamped at read time,
    /// sorted by expiration ascending.
    pub fn list_tuv_deadlines(&self) -> Result<Vec<TuvRecord>, InspectionError> {
        let today = self.clock.today();
        let mut records = self.store.tuv_records()?;
        for record in &mut records {
            let status = classify(record.expires_on, today);
            if status != record.status {
                self.store.stamp_tuv_status(record.id, status)?;
                record.status = status;
            }
        }
        records.sort_by_key(|record| record.expires_on);
        Ok(records)
    }

    /// Deadline aggregation for alerting: `expired` holds lapsed
    /// certifications, `warning` everything due within `horizon_days`.
    pub fn compute_tuv_alerts(&self, horizon_days: i64) -> Result<TuvAlerts, InspectionError> {
        let today = self.clock.today();
        let mut alerts = TuvAlerts::default();
        for record in self.list_tuv_deadlines()? {
            let days = days_remaining(record.expires_on, today);
            if days >= 0 && days > horizon_days {
                continue;
            }
            let plate = self
                .store
                .vehicle(record.vehicle_id)?
                .map(|vehicle| vehicle.plate)
                .unwrap_or_default();
            let alert = TuvAlert {
                vehicle_id: record.vehicle_id,
                plate,
                expires_on: record.expires_on,
                status: record.status,
                days_remaining: days,
            };
            if days < 0 {
                alerts.expired.push(alert);
            } else {
                alerts.warning.push(alert);
            }
        }
        Ok(alerts)
    }
}

fn parse_kind(raw: Option<&str>) -> Result<Option<ItemKind>, InspectionError> {
    match raw {
        None => Ok(None),
        Some(raw) => ItemKind::parse(raw)
            .map(Some)
            .ok_or_else(|| ValidationError::UnknownItemKind(raw.to_string()).into()),
    }
}

fn item_draft(
    checklist_id: ChecklistId,
    spec: &ItemSpec,
    kind: Option<ItemKind>,
    index: usize,
) -> NewChecklistItem {
    NewChecklistItem {
        checklist_id,
        description: spec.description.clone(),
        item_type: kind,
        validation_config: spec.validation_config.clone(),
        editable_roles: spec.editable_roles.clone().unwrap_or_default(),
        requires_tuv: spec.requires_tuv,
        subcategories: spec.subcategories.clone(),
        mandatory: spec.mandatory.unwrap_or(true),
        position: spec.position.unwrap_or((index as i32) * 10),
    }
}
