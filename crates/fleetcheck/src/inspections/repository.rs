use chrono::{DateTime, Utc};

use super::domain::{
    Checklist, ChecklistId, ChecklistItem, Execution, ExecutionId, ItemId, ItemResult,
    NewChecklist, NewChecklistItem, NewTuvRecord, ResultPayload, TuvRecord, TuvRecordId, UserId,
    Vehicle, VehicleGroup, VehicleGroupId, VehicleId,
};
use super::tuv::TuvStatus;

/// Error enumeration for storage collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of the atomic execution-start operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StartAttempt {
    Created(Execution),
    /// An execution for the (checklist, vehicle) pair is already running.
    AlreadyActive(ExecutionId),
}

/// Storage abstraction so the engine can be exercised in isolation.
///
/// Two operations carry atomicity contracts that implementations must
/// uphold (a read-then-write approximation is a defect, not a shortcut):
///
/// - [`start_execution`](Self::start_execution) performs the active-pair
///   uniqueness check and the insert inside one critical section, so two
///   concurrent starts for the same (checklist, vehicle) pair yield exactly
///   one `Created` and one `AlreadyActive`.
/// - [`upsert_result`](Self::upsert_result) is serialized per
///   (execution, item) key; concurrent submissions for the same item never
///   produce duplicate rows.
pub trait InspectionStore: Send + Sync {
    fn vehicle_group(&self, id: VehicleGroupId) -> Result<Option<VehicleGroup>, StoreError>;
    fn insert_vehicle_group(&self, name: &str) -> Result<VehicleGroup, StoreError>;

    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, StoreError>;
    fn insert_vehicle(&self, plate: &str, group_id: VehicleGroupId)
        -> Result<Vehicle, StoreError>;

    fn checklist(&self, id: ChecklistId) -> Result<Option<Checklist>, StoreError>;
    fn insert_checklist(
        &self,
        draft: NewChecklist,
        now: DateTime<Utc>,
    ) -> Result<Checklist, StoreError>;

    fn item(&self, id: ItemId) -> Result<Option<ChecklistItem>, StoreError>;
    fn items_for_checklist(&self, id: ChecklistId) -> Result<Vec<ChecklistItem>, StoreError>;
    fn insert_item(
        &self,
        draft: NewChecklistItem,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItem, StoreError>;
    fn update_item(&self, item: &ChecklistItem) -> Result<(), StoreError>;

    fn execution(&self, id: ExecutionId) -> Result<Option<Execution>, StoreError>;
    fn start_execution(
        &self,
        checklist_id: ChecklistId,
        vehicle_id: VehicleId,
        started_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<StartAttempt, StoreError>;
    fn update_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    fn result_for(
        &self,
        execution_id: ExecutionId,
        item_id: ItemId,
    ) -> Result<Option<ItemResult>, StoreError>;
    fn results_for_execution(&self, id: ExecutionId) -> Result<Vec<ItemResult>, StoreError>;
    fn upsert_result(
        &self,
        execution_id: ExecutionId,
        item_id: ItemId,
        payload: &ResultPayload,
        tuv_status: Option<TuvStatus>,
        now: DateTime<Utc>,
    ) -> Result<ItemResult, StoreError>;

    fn tuv_records(&self) -> Result<Vec<TuvRecord>, StoreError>;
    fn tuv_record_for_vehicle(&self, id: VehicleId) -> Result<Option<TuvRecord>, StoreError>;
    /// One record per vehicle; a second write replaces the deadline fields.
    fn upsert_tuv_record(
        &self,
        draft: NewTuvRecord,
        status: TuvStatus,
        now: DateTime<Utc>,
    ) -> Result<TuvRecord, StoreError>;
    fn stamp_tuv_status(&self, id: TuvRecordId, status: TuvStatus) -> Result<(), StoreError>;
}

/// Transactional batch boundary consumed by the sync replay processor.
pub trait UnitOfWork {
    type Checkpoint: Send;

    fn checkpoint(&self) -> Result<Self::Checkpoint, StoreError>;
    fn rollback_to(&self, checkpoint: Self::Checkpoint) -> Result<(), StoreError>;
}
