//! FleetCheck core library.
//!
//! Implements the equipment-inspection checklist engine for emergency
//! vehicle fleets: the polymorphic item-type model, the per-execution state
//! machine, role-based edit permissions, TÜV deadline derivation, and the
//! offline sync replay processor. The HTTP shell in `services/api` mounts
//! the router exposed by [`inspections`].

pub mod config;
pub mod error;
pub mod inspections;
pub mod telemetry;
