//! Eligibility gating.
//!
//! Two layers decide whether a student may use the synchronization
//! workflows: a local policy (feature switches the institution controls
//! without a remote call) and the SIS eligibility check. The local
//! layer short-circuits so a disabled deployment never touches the
//! network. The result is advisory; the SIS re-validates every write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use regsync_core::StudentId;
use regsync_sis::SisClient;

use crate::error::EngineResult;

/// Locally controlled switches, evaluated before any remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalPolicy {
    /// Whether real-time enrollment synchronization is open.
    pub enrollment_enabled: bool,
    /// Whether the special-registration (approval) workflow is open.
    pub special_requests_enabled: bool,
}

impl Default for LocalPolicy {
    fn default() -> Self {
        Self {
            enrollment_enabled: true,
            special_requests_enabled: true,
        }
    }
}

/// Combined eligibility decision for one student.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityFlags {
    /// May use real-time enrollment.
    pub can_enroll: bool,
    /// May raise override requests.
    pub can_request_overrides: bool,
    /// In the extended registration period; adds and drops need the
    /// extended override path.
    pub extended_registration: bool,
    /// Override codes the SIS permits for this student.
    pub allowed_overrides: Vec<String>,
    /// Student's current credit limit, when the SIS reports one.
    pub max_credit: Option<f32>,
    /// Reason the student was denied, when everything is off.
    pub denial_reason: Option<String>,
}

impl EligibilityFlags {
    /// A decision denying everything.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            can_enroll: false,
            can_request_overrides: false,
            extended_registration: false,
            allowed_overrides: Vec::new(),
            max_credit: None,
            denial_reason: Some(reason.into()),
        }
    }

    /// Whether any workflow is open to the student.
    #[must_use]
    pub fn any_allowed(&self) -> bool {
        self.can_enroll || self.can_request_overrides
    }
}

/// Evaluates eligibility, local policy first.
pub struct EligibilityGate<C> {
    client: Arc<C>,
    policy: LocalPolicy,
}

impl<C: SisClient> EligibilityGate<C> {
    /// Create a gate.
    #[must_use]
    pub fn new(client: Arc<C>, policy: LocalPolicy) -> Self {
        Self { client, policy }
    }

    /// Evaluate a student. Does not call the SIS when local policy
    /// already denies everything.
    #[instrument(skip(self))]
    pub async fn check(&self, student_id: &StudentId) -> EngineResult<EligibilityFlags> {
        if !self.policy.enrollment_enabled && !self.policy.special_requests_enabled {
            return Ok(EligibilityFlags::denied(
                "registration synchronization is disabled",
            ));
        }

        let response = self.client.check_eligibility(student_id).await?;
        Ok(EligibilityFlags {
            can_enroll: self.policy.enrollment_enabled && response.can_enroll,
            can_request_overrides: self.policy.special_requests_enabled
                && response.can_request_overrides,
            extended_registration: response.extended_registration,
            allowed_overrides: response.allowed_overrides,
            max_credit: response.max_credit,
            denial_reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_flags() {
        let flags = EligibilityFlags::denied("closed");
        assert!(!flags.any_allowed());
        assert_eq!(flags.denial_reason.as_deref(), Some("closed"));
    }
}
