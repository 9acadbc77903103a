use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;

use crate::inspections::catalog::{ItemKind, ValidationConfig};
use crate::inspections::domain::{
    ChecklistItem, ChecklistSpec, ChecklistWithItems, ItemId, ItemSpec, UserId, Vehicle,
    VehicleGroup,
};
use crate::inspections::memory::MemoryInspectionStore;
use crate::inspections::repository::InspectionStore;
use crate::inspections::roles::{ActingUser, Role};
use crate::inspections::service::{Clock, InspectionService};
use crate::inspections::sync::SyncProcessor;

/// Pinned clock so status derivation and timestamps are deterministic.
#[derive(Debug, Clone, Copy)]
pub(super) struct FixedClock {
    pub(super) now: DateTime<Utc>,
}

impl FixedClock {
    pub(super) fn at(date: NaiveDate) -> Self {
        Self {
            now: Utc.from_utc_datetime(&date.and_hms_opt(10, 0, 0).expect("valid time")),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn performer() -> ActingUser {
    ActingUser {
        id: UserId(100),
        role: Role::User,
    }
}

pub(super) fn other_member() -> ActingUser {
    ActingUser {
        id: UserId(101),
        role: Role::User,
    }
}

pub(super) fn group_leader() -> ActingUser {
    ActingUser {
        id: UserId(50),
        role: Role::GroupLeader,
    }
}

pub(super) fn organizer() -> ActingUser {
    ActingUser {
        id: UserId(7),
        role: Role::Organizer,
    }
}

pub(super) fn admin() -> ActingUser {
    ActingUser {
        id: UserId(1),
        role: Role::Admin,
    }
}

/// Seeded fleet shared by the state machine, sync, and routing tests.
pub(super) struct Fixture {
    pub(super) store: Arc<MemoryInspectionStore>,
    pub(super) service: Arc<InspectionService<MemoryInspectionStore>>,
    pub(super) sync: Arc<SyncProcessor<MemoryInspectionStore>>,
    pub(super) group: VehicleGroup,
    pub(super) vehicle: Vehicle,
    pub(super) foreign_vehicle: Vehicle,
    pub(super) checklist: ChecklistWithItems,
    pub(super) template: ChecklistWithItems,
    pub(super) foreign_checklist: ChecklistWithItems,
}

impl Fixture {
    pub(super) fn item(&self, kind: ItemKind) -> &ChecklistItem {
        self.checklist
            .items
            .iter()
            .find(|item| item.item_type == Some(kind))
            .expect("fixture item for kind")
    }

    pub(super) fn item_id(&self, kind: ItemKind) -> ItemId {
        self.item(kind).id
    }

    pub(super) fn untyped_item_id(&self) -> ItemId {
        self.checklist
            .items
            .iter()
            .find(|item| item.item_type.is_none())
            .expect("untyped fixture item")
            .id
    }
}

pub(super) fn fixture() -> Fixture {
    fixture_at(today())
}

pub(super) fn fixture_at(day: NaiveDate) -> Fixture {
    let store = Arc::new(MemoryInspectionStore::default());
    let service = Arc::new(InspectionService::with_clock(
        store.clone(),
        Arc::new(FixedClock::at(day)),
    ));
    let sync = Arc::new(SyncProcessor::new(service.clone(), store.clone()));

    let group = store.insert_vehicle_group("Station North").expect("group");
    let other_group = store.insert_vehicle_group("Station South").expect("group");
    let vehicle = store.insert_vehicle("FW-1042", group.id).expect("vehicle");
    let foreign_vehicle = store
        .insert_vehicle("FW-2077", other_group.id)
        .expect("vehicle");

    let checklist = service
        .create_checklist(weekly_spec(group.id.0), &organizer())
        .expect("checklist");
    let template = service
        .create_checklist(
            ChecklistSpec {
                name: "Weekly template".to_string(),
                group_id: group.id,
                template: true,
                items: vec![ItemSpec {
                    description: "Radio present".to_string(),
                    item_type: Some("standard".to_string()),
                    ..ItemSpec::default()
                }],
            },
            &organizer(),
        )
        .expect("template");
    let foreign_checklist = service
        .create_checklist(
            ChecklistSpec {
                name: "South weekly check".to_string(),
                group_id: other_group.id,
                template: false,
                items: vec![ItemSpec {
                    description: "Pump test".to_string(),
                    item_type: Some("status_check".to_string()),
                    ..ItemSpec::default()
                }],
            },
            &organizer(),
        )
        .expect("checklist");

    Fixture {
        store,
        service,
        sync,
        group,
        vehicle,
        foreign_vehicle,
        checklist,
        template,
        foreign_checklist,
    }
}

fn weekly_spec(group_id: i64) -> ChecklistSpec {
    ChecklistSpec {
        name: "Weekly vehicle check".to_string(),
        group_id: crate::inspections::domain::VehicleGroupId(group_id),
        template: false,
        items: vec![
            ItemSpec {
                description: "Vehicle and plate".to_string(),
                item_type: Some("vehicle_info".to_string()),
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Compartment G1".to_string(),
                item_type: Some("rating_1_6".to_string()),
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Fuel level".to_string(),
                item_type: Some("percentage".to_string()),
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Breathing apparatus".to_string(),
                item_type: Some("atemschutz".to_string()),
                requires_tuv: true,
                subcategories: Some(json!({
                    "tuv_plate": {"type": "date", "required": true},
                    "tuv_hood": {"type": "date", "required": true},
                    "pa_units": {"type": "array", "fields": ["serial", "pressure_bar"]},
                })),
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "First aid kit".to_string(),
                item_type: Some("standard".to_string()),
                requires_tuv: true,
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Fire hoses".to_string(),
                item_type: Some("quantity".to_string()),
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Ladder certification".to_string(),
                item_type: Some("date_check".to_string()),
                requires_tuv: true,
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Siren".to_string(),
                item_type: Some("status_check".to_string()),
                ..ItemSpec::default()
            },
            ItemSpec {
                description: "Legacy note".to_string(),
                item_type: None,
                ..ItemSpec::default()
            },
        ],
    }
}

/// Restrictive rating config used by override tests.
pub(super) fn narrow_rating_config() -> ValidationConfig {
    ValidationConfig {
        min_value: Some(2),
        max_value: Some(5),
        ..ValidationConfig::default()
    }
}
