//! Approval workflow statuses.
//!
//! Statuses reported by the SIS for override requests are merged with a
//! fixed precedence rather than overwritten: an aggregate is only
//! `Approved` when every constituent line item is approved, while a
//! single `Draft` or `Pending` line keeps the whole aggregate active.

use serde::{Deserialize, Serialize};

/// Status of an override request or one of its line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// Request has been assembled but not submitted.
    Draft,
    /// Submitted and awaiting a decision.
    Pending,
    /// Withdrawn, or no longer reported by the SIS.
    Cancelled,
    /// Denied by the approver or by policy.
    Rejected,
    /// Granted.
    Approved,
}

impl Status {
    /// Whether this status is terminal (no further transitions expected).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Cancelled | Status::Rejected | Status::Approved
        )
    }

    /// Precedence rank used by [`combine`]. Lower ranks dominate.
    fn rank(self) -> u8 {
        match self {
            Status::Draft => 0,
            Status::Pending => 1,
            Status::Cancelled => 2,
            Status::Rejected => 3,
            Status::Approved => 4,
        }
    }

    /// Merge two statuses, keeping the dominant one.
    ///
    /// Precedence order is Draft > Pending > Cancelled > Rejected >
    /// Approved. The operation is commutative and idempotent.
    #[must_use]
    pub fn merge(self, other: Status) -> Status {
        if other.rank() < self.rank() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Draft => "draft",
            Status::Pending => "pending",
            Status::Cancelled => "cancelled",
            Status::Rejected => "rejected",
            Status::Approved => "approved",
        };
        write!(f, "{name}")
    }
}

/// Merge two optional statuses.
///
/// A missing status never masks a present one; two present statuses are
/// merged by precedence (see [`Status::merge`]).
#[must_use]
pub fn combine(a: Option<Status>, b: Option<Status>) -> Option<Status> {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) => Some(a.merge(b)),
    }
}

/// Fold an iterator of optional statuses into one aggregate status.
#[must_use]
pub fn combine_all<I>(statuses: I) -> Option<Status>
where
    I: IntoIterator<Item = Option<Status>>,
{
    statuses.into_iter().fold(None, combine)
}
