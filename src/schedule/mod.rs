//! Interval-based work scheduling
//!
//! Maintains the hierarchical configuration of checks-per-asset and
//! computes, tick by tick, which (asset, check) pairs are due.
//!
//! ## Data Flow
//!
//! ```text
//! ContainerSource (tree load)  ─┐
//! HierarchyEvent (push updates) ┴──▶ ScheduleStore ──▶ TickState::select ──▶ WorkBatch
//! ```
//!
//! The store is owned by the runner actor, so tick reads never observe a
//! half-applied update: an asset upsert replaces that asset's whole check
//! set in one step.

pub mod events;
pub mod selector;
pub mod source;
pub mod store;

pub use events::{EventError, HierarchyEvent};
pub use selector::{TickState, WorkBatch, is_due};
pub use source::{AssetEntry, CheckEntry, ContainerSnapshot, ContainerSource, ServiceEntry};
pub use store::{ScheduleStore, ScheduledCheck};
