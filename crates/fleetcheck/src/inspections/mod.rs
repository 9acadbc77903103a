//! Inspection checklist engine.
//!
//! Modules are layered leaves-first: [`roles`] and [`catalog`] are pure and
//! dependency-free, [`validation`] and [`tuv`] build on them, [`service`]
//! drives the execution state machine against an [`repository::InspectionStore`],
//! and [`sync`] replays offline client batches through the service.

pub mod catalog;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod roles;
pub mod router;
pub mod service;
pub mod sync;
pub mod tuv;
pub mod validation;

#[cfg(test)]
mod tests;

pub use catalog::{item_type_catalog, InputShape, ItemKind, ItemTypeDescriptor, ValidationConfig};
pub use domain::{
    Checklist, ChecklistId, ChecklistItem, ChecklistSpec, ChecklistWithItems, Execution,
    ExecutionId, ExecutionStatus, ItemId, ItemPatch, ItemResult, ItemSpec, NewChecklist,
    NewChecklistItem, NewTuvRecord, ResultId, ResultPayload, ResultStatus, TuvRecord, TuvRecordId,
    UserId, Vehicle, VehicleGroup, VehicleGroupId, VehicleId,
};
pub use memory::MemoryInspectionStore;
pub use repository::{InspectionStore, StartAttempt, StoreError, UnitOfWork};
pub use roles::{ActingUser, Role, DEFAULT_EDITABLE_ROLES};
pub use router::{inspection_router, InspectionApi};
pub use service::{Clock, InspectionError, InspectionService, ItemValidationInfo, SystemClock};
pub use sync::{SyncAction, SyncFailure, SyncProcessor, SyncReport, SyncRequest};
pub use tuv::{classify, days_remaining, TuvAlert, TuvAlerts, TuvStatus, WARNING_WINDOW_DAYS};
pub use validation::{validate, ValidationError};
