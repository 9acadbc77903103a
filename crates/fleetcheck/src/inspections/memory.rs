use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Checklist, ChecklistId, ChecklistItem, Execution, ExecutionId, ExecutionStatus, ItemId,
    ItemResult, NewChecklist, NewChecklistItem, NewTuvRecord, ResultId, ResultPayload, TuvRecord,
    TuvRecordId, UserId, Vehicle, VehicleGroup, VehicleGroupId, VehicleId,
};
use super::repository::{InspectionStore, StartAttempt, StoreError, UnitOfWork};
use super::tuv::TuvStatus;

/// Reference implementation of the storage contract.
///
/// One mutex guards the whole state, which makes the check-then-insert in
/// `start_execution` and the per-key result upsert trivially atomic. The
/// cloned-state checkpoint doubles as the sync batch boundary.
#[derive(Debug, Default)]
pub struct MemoryInspectionStore {
    state: Mutex<StoreState>,
}

/// Opaque snapshot of the full store state.
#[derive(Debug)]
pub struct StoreSnapshot(StoreState);

#[derive(Debug, Clone, Default)]
struct StoreState {
    next_id: i64,
    groups: BTreeMap<VehicleGroupId, VehicleGroup>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    checklists: BTreeMap<ChecklistId, Checklist>,
    items: BTreeMap<ItemId, ChecklistItem>,
    executions: BTreeMap<ExecutionId, Execution>,
    results: BTreeMap<(ExecutionId, ItemId), ItemResult>,
    tuv: BTreeMap<TuvRecordId, TuvRecord>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryInspectionStore {
    fn state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("state mutex poisoned".to_string()))
    }
}

impl InspectionStore for MemoryInspectionStore {
    fn vehicle_group(&self, id: VehicleGroupId) -> Result<Option<VehicleGroup>, StoreError> {
        Ok(self.state()?.groups.get(&id).cloned())
    }

    fn insert_vehicle_group(&self, name: &str) -> Result<VehicleGroup, StoreError> {
        let mut state = self.state()?;
        let group = VehicleGroup {
            id: VehicleGroupId(state.next_id()),
            name: name.to_string(),
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, StoreError> {
        Ok(self.state()?.vehicles.get(&id).cloned())
    }

    fn insert_vehicle(
        &self,
        plate: &str,
        group_id: VehicleGroupId,
    ) -> Result<Vehicle, StoreError> {
        let mut state = self.state()?;
        if !state.groups.contains_key(&group_id) {
            return Err(StoreError::NotFound);
        }
        let vehicle = Vehicle {
            id: VehicleId(state.next_id()),
            plate: plate.to_string(),
            group_id,
        };
        state.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    fn checklist(&self, id: ChecklistId) -> Result<Option<Checklist>, StoreError> {
        Ok(self.state()?.checklists.get(&id).cloned())
    }

    fn insert_checklist(
        &self,
        draft: NewChecklist,
        now: DateTime<Utc>,
    ) -> Result<Checklist, StoreError> {
        let mut state = self.state()?;
        let checklist = Checklist {
            id: ChecklistId(state.next_id()),
            name: draft.name,
            group_id: draft.group_id,
            template: draft.template,
            created_by: draft.created_by,
            created_at: now,
        };
        state.checklists.insert(checklist.id, checklist.clone());
        Ok(checklist)
    }

    fn item(&self, id: ItemId) -> Result<Option<ChecklistItem>, StoreError> {
        Ok(self.state()?.items.get(&id).cloned())
    }

    fn items_for_checklist(&self, id: ChecklistId) -> Result<Vec<ChecklistItem>, StoreError> {
        let state = self.state()?;
        let mut items: Vec<ChecklistItem> = state
            .items
            .values()
            .filter(|item| item.checklist_id == id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.position, item.id));
        Ok(items)
    }

    fn insert_item(
        &self,
        draft: NewChecklistItem,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItem, StoreError> {
        let mut state = self.state()?;
        if !state.checklists.contains_key(&draft.checklist_id) {
            return Err(StoreError::NotFound);
        }
        let item = ChecklistItem {
            id: ItemId(state.next_id()),
            checklist_id: draft.checklist_id,
            description: draft.description,
            item_type: draft.item_type,
            validation_config: draft.validation_config,
            editable_roles: draft.editable_roles,
            requires_tuv: draft.requires_tuv,
            subcategories: draft.subcategories,
            mandatory: draft.mandatory,
            position: draft.position,
            created_at: now,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn update_item(&self, item: &ChecklistItem) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if !state.items.contains_key(&item.id) {
            return Err(StoreError::NotFound);
        }
        state.items.insert(item.id, item.clone());
        Ok(())
    }

    fn execution(&self, id: ExecutionId) -> Result<Option<Execution>, StoreError> {
        Ok(self.state()?.executions.get(&id).cloned())
    }

    fn start_execution(
        &self,
        checklist_id: ChecklistId,
        vehicle_id: VehicleId,
        started_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<StartAttempt, StoreError> {
        // Check and insert under one lock; this is the uniqueness guarantee
        // the state machine relies on.
        let mut state = self.state()?;
        if let Some(active) = state.executions.values().find(|execution| {
            execution.checklist_id == checklist_id
                && execution.vehicle_id == vehicle_id
                && execution.status == ExecutionStatus::Started
        }) {
            return Ok(StartAttempt::AlreadyActive(active.id));
        }
        let execution = Execution {
            id: ExecutionId(state.next_id()),
            checklist_id,
            vehicle_id,
            started_by,
            status: ExecutionStatus::Started,
            started_at: now,
            completed_at: None,
        };
        state.executions.insert(execution.id, execution.clone());
        Ok(StartAttempt::Created(execution))
    }

    fn update_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if !state.executions.contains_key(&execution.id) {
            return Err(StoreError::NotFound);
        }
        state.executions.insert(execution.id, execution.clone());
        Ok(())
    }

    fn result_for(
        &self,
        execution_id: ExecutionId,
        item_id: ItemId,
    ) -> Result<Option<ItemResult>, StoreError> {
        Ok(self.state()?.results.get(&(execution_id, item_id)).cloned())
    }

    fn results_for_execution(&self, id: ExecutionId) -> Result<Vec<ItemResult>, StoreError> {
        let state = self.state()?;
        Ok(state
            .results
            .values()
            .filter(|result| result.execution_id == id)
            .cloned()
            .collect())
    }

    fn upsert_result(
        &self,
        execution_id: ExecutionId,
        item_id: ItemId,
        payload: &ResultPayload,
        tuv_status: Option<TuvStatus>,
        now: DateTime<Utc>,
    ) -> Result<ItemResult, StoreError> {
        let mut state = self.state()?;
        if let Some(existing) = state.results.get_mut(&(execution_id, item_id)) {
            existing.apply(payload, tuv_status);
            return Ok(existing.clone());
        }
        let result = ItemResult::create(
            ResultId(state.next_id()),
            execution_id,
            item_id,
            payload,
            tuv_status,
            now,
        );
        state.results.insert((execution_id, item_id), result.clone());
        Ok(result)
    }

    fn tuv_records(&self) -> Result<Vec<TuvRecord>, StoreError> {
        Ok(self.state()?.tuv.values().cloned().collect())
    }

    fn tuv_record_for_vehicle(&self, id: VehicleId) -> Result<Option<TuvRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .tuv
            .values()
            .find(|record| record.vehicle_id == id)
            .cloned())
    }

    fn upsert_tuv_record(
        &self,
        draft: NewTuvRecord,
        status: TuvStatus,
        now: DateTime<Utc>,
    ) -> Result<TuvRecord, StoreError> {
        let mut state = self.state()?;
        let existing = state
            .tuv
            .values_mut()
            .find(|record| record.vehicle_id == draft.vehicle_id);
        if let Some(record) = existing {
            record.expires_on = draft.expires_on;
            record.last_inspection = draft.last_inspection;
            record.status = status;
            return Ok(record.clone());
        }
        let record = TuvRecord {
            id: TuvRecordId(state.next_id()),
            vehicle_id: draft.vehicle_id,
            expires_on: draft.expires_on,
            last_inspection: draft.last_inspection,
            status,
            created_at: now,
        };
        state.tuv.insert(record.id, record.clone());
        Ok(record)
    }

    fn stamp_tuv_status(&self, id: TuvRecordId, status: TuvStatus) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let record = state.tuv.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.status = status;
        Ok(())
    }
}

impl UnitOfWork for MemoryInspectionStore {
    type Checkpoint = StoreSnapshot;

    fn checkpoint(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot(self.state()?.clone()))
    }

    fn rollback_to(&self, checkpoint: StoreSnapshot) -> Result<(), StoreError> {
        *self.state()? = checkpoint.0;
        Ok(())
    }
}
