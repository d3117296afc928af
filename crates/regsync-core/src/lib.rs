//! regsync Core Library
//!
//! Shared domain model for the registration synchronization engine.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`StudentId`, `Crn`, `RequestId`)
//! - [`status`] - Approval workflow statuses and the precedence fold
//! - [`change`] - Registration change line items and their error vocabulary
//! - [`request`] - Override requests submitted to the student information system
//! - [`record`] - Reconciled per-student override records
//! - [`schedule`] - Desired schedules and current enrollment snapshots
//!
//! # Example
//!
//! ```
//! use regsync_core::{combine, Status};
//!
//! // A request is only approved once every line item is approved.
//! let summary = combine(Some(Status::Approved), Some(Status::Pending));
//! assert_eq!(summary, Some(Status::Pending));
//! ```

pub mod change;
pub mod ids;
pub mod record;
pub mod request;
pub mod schedule;
pub mod status;

// Re-export main types for convenient access
pub use change::{Change, ChangeError, ChangeOperation};
pub use ids::{CampusId, CourseId, Crn, RequestId, StudentId, TermId};
pub use record::{OverrideIntent, StudentOverrideRecord};
pub use request::{CompletionStatus, OverrideRequest};
pub use schedule::{CurrentEnrollment, DesiredCourse, DesiredSchedule, DesiredSection, EnrollmentLine};
pub use status::{combine, combine_all, Status};
