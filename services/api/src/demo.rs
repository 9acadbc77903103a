use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use serde_json::json;

use crate::infra::{parse_date, PinnedClock};
use fleetcheck::error::AppError;
use fleetcheck::inspections::{
    ActingUser, ChecklistSpec, ChecklistWithItems, Clock, InspectionError, InspectionService,
    InspectionStore,
    ItemKind, ItemSpec, MemoryInspectionStore, NewTuvRecord, ResultPayload, ResultStatus, Role,
    SyncAction, SyncProcessor, SyncRequest, SystemClock, UserId, Vehicle,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Pin the demo date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct TuvReportArgs {
    /// Alert horizon in days for the warning bucket.
    #[arg(long, default_value_t = 30)]
    pub(crate) horizon_days: i64,
    /// Pin the report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn organizer() -> ActingUser {
    ActingUser {
        id: UserId(2),
        role: Role::Organizer,
    }
}

fn performer() -> ActingUser {
    ActingUser {
        id: UserId(17),
        role: Role::User,
    }
}

pub(crate) struct SeededFleet {
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) checklist: ChecklistWithItems,
}

/// Seed a small station fleet: one group, two vehicles, the weekly
/// checklist covering every item kind, and TÜV deadlines on both vehicles.
pub(crate) fn seed_fleet(
    store: &Arc<MemoryInspectionStore>,
    service: &InspectionService<MemoryInspectionStore>,
    today: NaiveDate,
) -> Result<SeededFleet, AppError> {
    let group = store
        .insert_vehicle_group("Station North")
        .map_err(InspectionError::Store)?;
    let engine = store
        .insert_vehicle("FW-1042", group.id)
        .map_err(InspectionError::Store)?;
    let ladder = store
        .insert_vehicle("FW-2203", group.id)
        .map_err(InspectionError::Store)?;

    let checklist = service.create_checklist(
        ChecklistSpec {
            name: "Weekly vehicle check".to_string(),
            group_id: group.id,
            template: false,
            items: vec![
                item("Vehicle and plate", Some("vehicle_info")),
                item("Compartment G1", Some("rating_1_6")),
                item("Fuel level", Some("percentage")),
                item("Breathing apparatus", Some("atemschutz")),
                item("First aid kit", Some("standard")),
                item("Fire hoses", Some("quantity")),
                item("Ladder certification", Some("date_check")),
                item("Siren", Some("status_check")),
                item("Legacy note", None),
            ],
        },
        &organizer(),
    )?;

    service.upsert_tuv_record(
        NewTuvRecord {
            vehicle_id: engine.id,
            expires_on: today + Duration::days(21),
            last_inspection: Some(today - Duration::days(710)),
        },
        &organizer(),
    )?;
    service.upsert_tuv_record(
        NewTuvRecord {
            vehicle_id: ladder.id,
            expires_on: today - Duration::days(12),
            last_inspection: Some(today - Duration::days(742)),
        },
        &organizer(),
    )?;

    Ok(SeededFleet {
        vehicles: vec![engine, ladder],
        checklist,
    })
}

fn item(description: &str, kind: Option<&str>) -> ItemSpec {
    ItemSpec {
        description: description.to_string(),
        item_type: kind.map(str::to_string),
        ..ItemSpec::default()
    }
}

fn build_clock(today: Option<NaiveDate>) -> (Arc<dyn Clock>, NaiveDate) {
    match today {
        Some(date) => (Arc::new(PinnedClock::at(date)), date),
        None => (Arc::new(SystemClock), Local::now().date_naive()),
    }
}

/// Walk one full inspection cycle on the console: run, validation
/// rejections, completion, offline replay, deadline report.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (clock, today) = build_clock(args.today);
    let store = Arc::new(MemoryInspectionStore::default());
    let service = Arc::new(InspectionService::with_clock(store.clone(), clock));
    let sync = SyncProcessor::new(service.clone(), store.clone());
    let fleet = seed_fleet(&store, &service, today)?;
    let vehicle = &fleet.vehicles[0];

    println!("== FleetCheck demo ({today}) ==");
    println!(
        "Seeded {} with checklist '{}' ({} items)",
        vehicle.plate,
        fleet.checklist.checklist.name,
        fleet.checklist.items.len()
    );

    let execution =
        service.start_execution(fleet.checklist.checklist.id, vehicle.id, &performer())?;
    println!("\nStarted execution {} on {}", execution.id.0, vehicle.plate);

    let submissions = [
        (ItemKind::Rating, ResultPayload {
            value: Some(json!(5)),
            ..ResultPayload::default()
        }),
        (ItemKind::Percentage, ResultPayload {
            value: Some(json!(85)),
            ..ResultPayload::default()
        }),
        (ItemKind::Atemschutz, ResultPayload {
            value: Some(json!({
                "tuv_plate": (today + Duration::days(230)).to_string(),
                "tuv_hood": (today + Duration::days(290)).to_string(),
                "pa_units": [{"serial": "PA-7", "pressure_bar": 300}],
            })),
            ..ResultPayload::default()
        }),
        (ItemKind::Standard, ResultPayload {
            present: Some(true),
            status: Some(ResultStatus::Ok),
            tuv_date: Some(today + Duration::days(16)),
            ..ResultPayload::default()
        }),
        (ItemKind::Quantity, ResultPayload {
            quantity: Some(7),
            ..ResultPayload::default()
        }),
        (ItemKind::DateCheck, ResultPayload {
            tuv_date: Some(today + Duration::days(108)),
            ..ResultPayload::default()
        }),
        (ItemKind::StatusCheck, ResultPayload {
            status: Some(ResultStatus::Error),
            comment: Some("horn tone distorted".to_string()),
            ..ResultPayload::default()
        }),
    ];
    for (kind, payload) in submissions {
        let item = fleet
            .checklist
            .items
            .iter()
            .find(|item| item.item_type == Some(kind))
            .expect("seeded item");
        let result = service.record_result(execution.id, item.id, payload, &performer())?;
        match result.tuv_status {
            Some(status) => println!(
                "  {} -> {} (TÜV {})",
                item.description,
                result.status.label(),
                status.label()
            ),
            None => println!("  {} -> {}", item.description, result.status.label()),
        }
    }

    println!("\nRejected submissions:");
    for (kind, payload, label) in [
        (
            ItemKind::Rating,
            ResultPayload {
                value: Some(json!(9)),
                ..ResultPayload::default()
            },
            "rating 9",
        ),
        (
            ItemKind::VehicleInfo,
            ResultPayload {
                value: Some(json!("HLF 20")),
                ..ResultPayload::default()
            },
            "vehicle data edit",
        ),
    ] {
        let item = fleet
            .checklist
            .items
            .iter()
            .find(|item| item.item_type == Some(kind))
            .expect("seeded item");
        match service.record_result(execution.id, item.id, payload, &performer()) {
            Err(err) => println!("  {label}: {err}"),
            Ok(_) => println!("  {label}: unexpectedly accepted"),
        }
    }

    let completed = service.complete_execution(execution.id, &performer())?;
    println!(
        "\nCompleted execution {} at {}",
        completed.id.0,
        completed
            .completed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default()
    );

    // an offline client replays its queue: one duplicate start, one stale item
    let ladder_start = SyncAction {
        request: SyncRequest::CreateExecution {
            checklist_id: fleet.checklist.checklist.id,
            vehicle_id: fleet.vehicles[1].id,
        },
        timestamp: chrono::Utc::now(),
    };
    let stale_update = SyncAction {
        request: SyncRequest::UpdateItemResult {
            execution_id: execution.id,
            item_id: fleet.checklist.items[0].id,
            payload: ResultPayload::default(),
        },
        timestamp: chrono::Utc::now(),
    };
    let report = sync.process_batch(
        &[ladder_start.clone(), ladder_start, stale_update],
        "demo-tablet",
        &performer(),
    );
    println!(
        "\nSync replay: processed {}, failed {}",
        report.processed, report.failed
    );
    for failure in &report.errors {
        println!("  {}: {}", failure.action, failure.reason);
    }

    print_tuv_report(&service, 30)?;
    Ok(())
}

pub(crate) fn run_tuv_report(args: TuvReportArgs) -> Result<(), AppError> {
    let (clock, today) = build_clock(args.today);
    let store = Arc::new(MemoryInspectionStore::default());
    let service = Arc::new(InspectionService::with_clock(store.clone(), clock));
    seed_fleet(&store, &service, today)?;

    println!("== TÜV deadline report ({today}) ==");
    print_tuv_report(&service, args.horizon_days)
}

fn print_tuv_report(
    service: &InspectionService<MemoryInspectionStore>,
    horizon_days: i64,
) -> Result<(), AppError> {
    let alerts = service.compute_tuv_alerts(horizon_days)?;

    println!("\nTÜV alerts (horizon {horizon_days} days):");
    if alerts.expired.is_empty() && alerts.warning.is_empty() {
        println!("  nothing due");
        return Ok(());
    }
    for alert in &alerts.expired {
        println!(
            "  EXPIRED {} since {} ({} days)",
            alert.plate,
            alert.expires_on,
            -alert.days_remaining
        );
    }
    for alert in &alerts.warning {
        println!(
            "  warning {} due {} (in {} days)",
            alert.plate, alert.expires_on, alert.days_remaining
        );
    }
    Ok(())
}
