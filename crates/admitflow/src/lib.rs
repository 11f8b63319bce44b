//! Core engine for the admitflow admissions portal.
//!
//! The crate is organized around two bounded contexts: [`admissions`] covers
//! course eligibility, submission constraints, and the decision state machine,
//! while [`directory`] covers organization access lifecycle and the suspension
//! cascade. Storage and notification delivery are expressed as traits so the
//! engine can run against any document store that offers conditional writes.

pub mod admissions;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod notify;
pub mod store;
pub mod telemetry;
