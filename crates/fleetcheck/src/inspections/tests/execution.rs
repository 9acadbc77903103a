use std::thread;

use serde_json::json;

use super::common::*;
use crate::inspections::catalog::ItemKind;
use crate::inspections::domain::{
    ChecklistId, ChecklistSpec, ExecutionId, ExecutionStatus, ItemPatch, ItemSpec, ResultPayload,
    ResultStatus, VehicleId,
};
use crate::inspections::repository::InspectionStore;
use crate::inspections::roles::Role;
use crate::inspections::service::InspectionError;
use crate::inspections::tuv::TuvStatus;
use crate::inspections::validation::ValidationError;

#[test]
fn start_creates_a_started_execution() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");

    assert_eq!(execution.status, ExecutionStatus::Started);
    assert_eq!(execution.started_by, performer().id);
    assert!(execution.completed_at.is_none());
}

#[test]
fn second_start_for_the_same_pair_conflicts() {
    let fx = fixture();
    fx.service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("first start");

    let err = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &other_member())
        .expect_err("second start must conflict");
    assert!(matches!(err, InspectionError::Conflict(_)));
}

#[test]
fn concurrent_starts_yield_exactly_one_execution() {
    let fx = fixture();
    let checklist_id = fx.checklist.checklist.id;
    let vehicle_id = fx.vehicle.id;

    let handles: Vec<_> = [performer(), other_member()]
        .into_iter()
        .map(|user| {
            let service = fx.service.clone();
            thread::spawn(move || service.start_execution(checklist_id, vehicle_id, &user))
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread joins"))
        .collect();

    let started = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(InspectionError::Conflict(_))))
        .count();
    assert_eq!((started, conflicts), (1, 1));
}

#[test]
fn missing_references_are_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.service
            .start_execution(ChecklistId(9999), fx.vehicle.id, &performer()),
        Err(InspectionError::NotFound(_))
    ));
    assert!(matches!(
        fx.service
            .start_execution(fx.checklist.checklist.id, VehicleId(9999), &performer()),
        Err(InspectionError::NotFound(_))
    ));
}

#[test]
fn cross_group_execution_is_not_found() {
    let fx = fixture();
    let err = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.foreign_vehicle.id, &performer())
        .expect_err("cross-group start must fail");
    assert!(matches!(err, InspectionError::NotFound(_)));
}

#[test]
fn templates_cannot_be_executed() {
    let fx = fixture();
    let err = fx
        .service
        .start_execution(fx.template.checklist.id, fx.vehicle.id, &performer())
        .expect_err("template start must fail");
    assert!(matches!(err, InspectionError::Conflict(_)));
}

#[test]
fn record_result_upserts_in_place() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");
    let item_id = fx.item_id(ItemKind::Rating);

    let first = ResultPayload {
        value: Some(json!(5)),
        comment: Some("slightly worn".to_string()),
        ..ResultPayload::default()
    };
    let created = fx
        .service
        .record_result(execution.id, item_id, first, &performer())
        .expect("first submission");

    let second = ResultPayload {
        value: Some(json!(3)),
        ..ResultPayload::default()
    };
    let updated = fx
        .service
        .record_result(execution.id, item_id, second, &performer())
        .expect("second submission");

    assert_eq!(created.id, updated.id);
    assert_eq!(updated.value, Some(json!(3)));
    // fields absent from the second payload survive
    assert_eq!(updated.comment, Some("slightly worn".to_string()));

    let results = fx
        .store
        .results_for_execution(execution.id)
        .expect("results");
    assert_eq!(results.len(), 1);
}

#[test]
fn record_result_rejects_invalid_values() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");

    let err = fx
        .service
        .record_result(
            execution.id,
            fx.item_id(ItemKind::Rating),
            ResultPayload {
                value: Some(json!(9)),
                ..ResultPayload::default()
            },
            &performer(),
        )
        .expect_err("out-of-range rating");
    assert!(matches!(
        err,
        InspectionError::Invalid(ValidationError::OutOfRange { .. })
    ));

    // a failed submission leaves no result behind
    assert!(fx
        .store
        .results_for_execution(execution.id)
        .expect("results")
        .is_empty());
}

#[test]
fn record_result_enforces_ownership() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");
    let payload = ResultPayload {
        status: Some(ResultStatus::Ok),
        ..ResultPayload::default()
    };

    let err = fx
        .service
        .record_result(
            execution.id,
            fx.item_id(ItemKind::StatusCheck),
            payload.clone(),
            &other_member(),
        )
        .expect_err("stranger may not record");
    assert!(matches!(err, InspectionError::Forbidden(_)));

    // organizers may record on anyone's run
    fx.service
        .record_result(
            execution.id,
            fx.item_id(ItemKind::StatusCheck),
            payload,
            &organizer(),
        )
        .expect("organizer records");
}

#[test]
fn record_result_requires_item_of_the_same_checklist() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");
    let foreign_item = fx.foreign_checklist.items[0].id;

    let err = fx
        .service
        .record_result(
            execution.id,
            foreign_item,
            ResultPayload::default(),
            &performer(),
        )
        .expect_err("foreign item must not attach");
    assert!(matches!(err, InspectionError::NotFound(_)));
}

#[test]
fn record_result_accepts_untyped_legacy_items() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");

    fx.service
        .record_result(
            execution.id,
            fx.untyped_item_id(),
            ResultPayload {
                value: Some(json!("chalk marks on panel")),
                ..ResultPayload::default()
            },
            &performer(),
        )
        .expect("legacy items bypass validation");
}

#[test]
fn record_result_derives_tuv_status() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");
    let item_id = fx.item_id(ItemKind::DateCheck);

    let soon = fx
        .service
        .record_result(
            execution.id,
            item_id,
            ResultPayload {
                tuv_date: Some(date(2025, 6, 25)),
                ..ResultPayload::default()
            },
            &performer(),
        )
        .expect("submission");
    assert_eq!(soon.tuv_status, Some(TuvStatus::Warning));

    let far = fx
        .service
        .record_result(
            execution.id,
            item_id,
            ResultPayload {
                tuv_date: Some(date(2025, 9, 1)),
                ..ResultPayload::default()
            },
            &performer(),
        )
        .expect("submission");
    assert_eq!(far.tuv_status, Some(TuvStatus::Current));
}

#[test]
fn complete_stamps_the_completion_time() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");

    let completed = fx
        .service
        .complete_execution(execution.id, &performer())
        .expect("complete");
    assert_eq!(completed.status, ExecutionStatus::Completed);
    assert_eq!(completed.completed_at, Some(FixedClock::at(today()).now));
}

#[test]
fn completed_executions_reject_further_mutation() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");
    fx.service
        .complete_execution(execution.id, &performer())
        .expect("complete");

    let err = fx
        .service
        .record_result(
            execution.id,
            fx.item_id(ItemKind::StatusCheck),
            ResultPayload::default(),
            &performer(),
        )
        .expect_err("completed runs are closed");
    assert!(matches!(err, InspectionError::Conflict(_)));

    let err = fx
        .service
        .complete_execution(execution.id, &performer())
        .expect_err("double complete");
    assert!(matches!(err, InspectionError::Conflict(_)));
}

#[test]
fn cancel_is_terminal_without_completion_time() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");

    let cancelled = fx
        .service
        .cancel_execution(execution.id, &performer())
        .expect("cancel");
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert!(cancelled.completed_at.is_none());

    assert!(matches!(
        fx.service
            .record_result(
                execution.id,
                fx.item_id(ItemKind::StatusCheck),
                ResultPayload::default(),
                &performer()
            ),
        Err(InspectionError::Conflict(_))
    ));
}

#[test]
fn complete_requires_owner_or_organizer() {
    let fx = fixture();
    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");

    assert!(matches!(
        fx.service.complete_execution(execution.id, &other_member()),
        Err(InspectionError::Forbidden(_))
    ));
    fx.service
        .complete_execution(execution.id, &organizer())
        .expect("organizer may close");
}

#[test]
fn unknown_execution_is_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.service.record_result(
            ExecutionId(9999),
            fx.item_id(ItemKind::Rating),
            ResultPayload::default(),
            &performer()
        ),
        Err(InspectionError::NotFound(_))
    ));
}

#[test]
fn create_checklist_rejects_unknown_item_kinds() {
    let fx = fixture();
    let spec = ChecklistSpec {
        name: "Broken".to_string(),
        group_id: fx.group.id,
        template: false,
        items: vec![ItemSpec {
            description: "Mystery".to_string(),
            item_type: Some("telepathy_check".to_string()),
            ..ItemSpec::default()
        }],
    };
    let err = fx
        .service
        .create_checklist(spec, &organizer())
        .expect_err("unknown kind must be rejected");
    assert!(matches!(
        err,
        InspectionError::Invalid(ValidationError::UnknownItemKind(_))
    ));
}

#[test]
fn create_checklist_requires_organizer_level() {
    let fx = fixture();
    let spec = ChecklistSpec {
        name: "Nope".to_string(),
        group_id: fx.group.id,
        template: false,
        items: Vec::new(),
    };
    assert!(matches!(
        fx.service.create_checklist(spec, &group_leader()),
        Err(InspectionError::Forbidden(_))
    ));
}

#[test]
fn update_item_respects_editable_roles() {
    let fx = fixture();
    let vehicle_info_item = fx.item_id(ItemKind::VehicleInfo);
    let patch = ItemPatch {
        description: Some("Vehicle and registration plate".to_string()),
        ..ItemPatch::default()
    };

    // vehicle_info defaults to admin-only editing
    assert!(matches!(
        fx.service
            .update_item(vehicle_info_item, patch.clone(), &organizer()),
        Err(InspectionError::Forbidden(_))
    ));
    let updated = fx
        .service
        .update_item(vehicle_info_item, patch, &admin())
        .expect("admin edits vehicle info");
    assert_eq!(updated.description, "Vehicle and registration plate");

    assert!(matches!(
        fx.service.update_item(
            fx.item_id(ItemKind::Rating),
            ItemPatch::default(),
            &group_leader()
        ),
        Err(InspectionError::Forbidden(_))
    ));
}

#[test]
fn update_item_config_tightens_validation() {
    let fx = fixture();
    let item_id = fx.item_id(ItemKind::Rating);
    fx.service
        .update_item(
            item_id,
            ItemPatch {
                validation_config: Some(narrow_rating_config()),
                ..ItemPatch::default()
            },
            &organizer(),
        )
        .expect("config update");

    let execution = fx
        .service
        .start_execution(fx.checklist.checklist.id, fx.vehicle.id, &performer())
        .expect("start");
    let err = fx
        .service
        .record_result(
            execution.id,
            item_id,
            ResultPayload {
                value: Some(json!(6)),
                ..ResultPayload::default()
            },
            &performer(),
        )
        .expect_err("6 is outside the tightened range");
    assert!(matches!(
        err,
        InspectionError::Invalid(ValidationError::OutOfRange { min: 2, max: 5, .. })
    ));
}

#[test]
fn update_item_rejects_unknown_kind_strings() {
    let fx = fixture();
    let err = fx
        .service
        .update_item(
            fx.item_id(ItemKind::Rating),
            ItemPatch {
                item_type: Some("mystery".to_string()),
                ..ItemPatch::default()
            },
            &organizer(),
        )
        .expect_err("unknown kind");
    assert!(matches!(
        err,
        InspectionError::Invalid(ValidationError::UnknownItemKind(_))
    ));
}

#[test]
fn validation_info_reports_merged_config_and_editability() {
    let fx = fixture();
    let info = fx
        .service
        .item_validation_info(fx.item_id(ItemKind::Rating), &group_leader())
        .expect("info");

    assert_eq!(info.item_type, Some(ItemKind::Rating));
    assert_eq!(info.validation_config.min_value, Some(1));
    assert_eq!(info.validation_config.max_value, Some(6));
    assert!(!info.editable_by_current_user);
    assert_eq!(info.editable_roles, vec![Role::Organizer, Role::Admin]);

    let info = fx
        .service
        .item_validation_info(fx.item_id(ItemKind::VehicleInfo), &organizer())
        .expect("info");
    assert!(!info.editable_by_current_user);
    assert_eq!(info.editable_roles, vec![Role::Admin]);

    let info = fx
        .service
        .item_validation_info(fx.item_id(ItemKind::Atemschutz), &admin())
        .expect("info");
    assert!(info.requires_tuv);
    assert!(info.subcategories.is_some());
    assert!(info.editable_by_current_user);
}

#[test]
fn item_type_listing_covers_all_eight_kinds() {
    let fx = fixture();
    let descriptors = fx.service.list_item_types();
    assert_eq!(descriptors.len(), 8);
    assert!(descriptors
        .iter()
        .any(|descriptor| descriptor.kind == ItemKind::VehicleInfo && !descriptor.editable));
}
