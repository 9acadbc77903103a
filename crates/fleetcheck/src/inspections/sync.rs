use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{ChecklistId, ChecklistSpec, ExecutionId, ItemId, ResultPayload, VehicleId};
use super::repository::{InspectionStore, StartAttempt, StoreError, UnitOfWork};
use super::roles::ActingUser;
use super::service::{InspectionError, InspectionService};

/// One queued client action with its client-side timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAction {
    #[serde(flatten)]
    pub request: SyncRequest,
    pub timestamp: DateTime<Utc>,
}

/// The four replayable action kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncRequest {
    CreateExecution {
        checklist_id: ChecklistId,
        vehicle_id: VehicleId,
    },
    UpdateItemResult {
        execution_id: ExecutionId,
        item_id: ItemId,
        #[serde(flatten)]
        payload: ResultPayload,
    },
    CompleteExecution {
        execution_id: ExecutionId,
    },
    CreateChecklist {
        #[serde(flatten)]
        spec: ChecklistSpec,
    },
}

impl SyncRequest {
    pub const fn kind_label(&self) -> &'static str {
        match self {
            SyncRequest::CreateExecution { .. } => "create_execution",
            SyncRequest::UpdateItemResult { .. } => "update_item_result",
            SyncRequest::CompleteExecution { .. } => "complete_execution",
            SyncRequest::CreateChecklist { .. } => "create_checklist",
        }
    }
}

/// One failed action in the batch report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncFailure {
    pub action: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Batch outcome returned to the syncing client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<SyncFailure>,
}

/// Replays offline client batches against the inspection service.
///
/// Actions run sequentially and each is atomic on its own: a failure is
/// captured in the report and the loop continues. The store checkpoint
/// taken up front is the batch boundary: zero successes roll everything
/// back, while any success commits all successes together (partial batches
/// are intended behavior). A storage-collaborator failure aborts the batch
/// and nothing survives.
pub struct SyncProcessor<S> {
    service: Arc<InspectionService<S>>,
    store: Arc<S>,
}

impl<S> SyncProcessor<S>
where
    S: InspectionStore + UnitOfWork,
{
    pub fn new(service: Arc<InspectionService<S>>, store: Arc<S>) -> Self {
        Self { service, store }
    }

    pub fn process_batch(
        &self,
        actions: &[SyncAction],
        client_id: &str,
        user: &ActingUser,
    ) -> SyncReport {
        let checkpoint = match self.store.checkpoint() {
            Ok(checkpoint) => checkpoint,
            Err(err) => return batch_failure(actions, &err.to_string()),
        };

        let mut report = SyncReport::default();
        let mut fatal: Option<String> = None;

        for action in actions {
            match self.apply(action, user) {
                Ok(_resource_id) => report.processed += 1,
                Err(InspectionError::Store(StoreError::Unavailable(reason))) => {
                    fatal = Some(reason);
                    break;
                }
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(SyncFailure {
                        action: action.request.kind_label(),
                        reason: err.to_string(),
                        timestamp: Some(action.timestamp),
                    });
                }
            }
        }

        if let Some(reason) = fatal {
            warn!(client_id, %reason, "sync batch aborted by storage failure");
            if let Err(err) = self.store.rollback_to(checkpoint) {
                warn!(client_id, error = %err, "sync batch rollback failed");
            }
            return batch_failure(actions, &reason);
        }

        if report.processed == 0 && !actions.is_empty() {
            if let Err(err) = self.store.rollback_to(checkpoint) {
                warn!(client_id, error = %err, "sync batch rollback failed");
            }
        }

        info!(
            client_id,
            processed = report.processed,
            failed = report.failed,
            "sync batch replayed"
        );
        report
    }

    fn apply(&self, action: &SyncAction, user: &ActingUser) -> Result<i64, InspectionError> {
        match &action.request {
            SyncRequest::CreateExecution {
                checklist_id,
                vehicle_id,
            } => match self.service.begin_execution(*checklist_id, *vehicle_id, user)? {
                StartAttempt::Created(execution) => Ok(execution.id.0),
                // Replays of the same client action adopt the running
                // execution instead of erroring.
                StartAttempt::AlreadyActive(id) => Ok(id.0),
            },
            SyncRequest::UpdateItemResult {
                execution_id,
                item_id,
                payload,
            } => self
                .service
                .record_result(*execution_id, *item_id, payload.clone(), user)
                .map(|result| result.id.0),
            SyncRequest::CompleteExecution { execution_id } => self
                .service
                .complete_execution(*execution_id, user)
                .map(|execution| execution.id.0),
            SyncRequest::CreateChecklist { spec } => self
                .service
                .create_checklist(spec.clone(), user)
                .map(|created| created.checklist.id.0),
        }
    }
}

fn batch_failure(actions: &[SyncAction], reason: &str) -> SyncReport {
    SyncReport {
        processed: 0,
        failed: actions.len(),
        errors: vec![SyncFailure {
            action: "batch",
            reason: format!("batch processing failed: {reason}"),
            timestamp: None,
        }],
    }
}
