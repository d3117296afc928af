//! Registration synchronization engine.
//!
//! Orchestrates the two consistency loops between the local scheduling
//! front end and the institutional SIS:
//!
//! ```text
//!   desired schedule ──diff──▶ action list ──submit──▶ SIS
//!        ▲                                              │
//!        │                per-line errors / overrides   │
//!        └──────────────── reconciliation sweep ◀───────┘
//! ```
//!
//! The real-time path ([`EnrollmentSynchronizer`]) diffs a desired
//! schedule against a fresh SIS read and submits the delta, retrying
//! with auto-attached overrides. The approval path
//! ([`OverrideRequestManager`]) routes changes that need human sign-off
//! through the special-registration workflow, and
//! [`StatusReconciler`] keeps the local projection of those decisions
//! in step with the SIS.
//!
//! All SIS access goes through [`regsync_sis::SisClient`]; all
//! persistence goes through [`OverrideStore`].

pub mod changeset;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod overrides;
pub mod reconcile;
pub mod store;
pub mod sync;

pub use changeset::{ChangeSet, ChangeSetBuilder, PriorError};
pub use config::{ConditionalAddDropPolicy, EngineConfig};
pub use eligibility::{EligibilityFlags, EligibilityGate, LocalPolicy};
pub use error::{EngineError, EngineResult};
pub use overrides::OverrideRequestManager;
pub use reconcile::{BatchSummary, StatusReconciler};
pub use store::{MemoryOverrideStore, OverrideStore};
pub use sync::{EnrollmentFailure, EnrollmentSynchronizer};
