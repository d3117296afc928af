//! Scripted in-process SIS for engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use regsync_core::{OverrideRequest, RequestId, StudentId};
use regsync_sis::wire::{
    BatchStatusResponse, CheckRestrictionsRequest, CheckRestrictionsResponse, EligibilityResponse,
    EnrollmentActionKind, EnrollmentChangeRequest, EnrollmentResponse, EnrollmentResultLine,
    EnrollmentResultResponse, SpecialRegistrationStatusResponse, SubmitRegistrationResponse,
    UpdateNotesRequest,
};
use regsync_sis::{SisClient, SisError, SisResult};

/// Scripted SIS. Responses are queued ahead of the test; submissions
/// are recorded for assertion. When the enrollment-result queue runs
/// dry, a success response is synthesized from the submitted actions.
pub struct FakeSis {
    pub eligibility: Mutex<EligibilityResponse>,
    pub eligibility_calls: AtomicUsize,
    pub enrollment: Mutex<Option<EnrollmentResponse>>,
    pub enrollment_results: Mutex<VecDeque<EnrollmentResultResponse>>,
    pub submissions: Mutex<Vec<EnrollmentChangeRequest>>,
    pub sweep: Mutex<SpecialRegistrationStatusResponse>,
    pub batch_sweep: Mutex<BatchStatusResponse>,
    pub batch_calls: AtomicUsize,
    pub submit_response: Mutex<Option<SubmitRegistrationResponse>>,
    pub submitted_requests: Mutex<Vec<OverrideRequest>>,
    pub cancelled: Mutex<Vec<RequestId>>,
    pub restrictions: Mutex<CheckRestrictionsResponse>,
    pub restriction_requests: Mutex<Vec<CheckRestrictionsRequest>>,
}

impl Default for FakeSis {
    fn default() -> Self {
        Self {
            eligibility: Mutex::new(EligibilityResponse {
                can_enroll: true,
                can_request_overrides: true,
                ..Default::default()
            }),
            eligibility_calls: AtomicUsize::new(0),
            enrollment: Mutex::new(None),
            enrollment_results: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            sweep: Mutex::new(SpecialRegistrationStatusResponse::default()),
            batch_sweep: Mutex::new(BatchStatusResponse::default()),
            batch_calls: AtomicUsize::new(0),
            submit_response: Mutex::new(None),
            submitted_requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            restrictions: Mutex::new(CheckRestrictionsResponse::default()),
            restriction_requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enrollment(&self, response: EnrollmentResponse) {
        *self.enrollment.lock().unwrap() = Some(response);
    }

    pub fn queue_result(&self, response: EnrollmentResultResponse) {
        self.enrollment_results.lock().unwrap().push_back(response);
    }

    pub fn submissions(&self) -> Vec<EnrollmentChangeRequest> {
        self.submissions.lock().unwrap().clone()
    }

    fn synthesize_success(request: &EnrollmentChangeRequest) -> EnrollmentResultResponse {
        EnrollmentResultResponse {
            lines: request
                .actions
                .iter()
                .map(|action| EnrollmentResultLine {
                    crn: action.crn.clone(),
                    registered: action.operation != EnrollmentActionKind::Drop,
                    errors: Vec::new(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SisClient for FakeSis {
    async fn check_eligibility(&self, _student_id: &StudentId) -> SisResult<EligibilityResponse> {
        self.eligibility_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.eligibility.lock().unwrap().clone())
    }

    async fn special_registration_status(
        &self,
        _student_id: &StudentId,
    ) -> SisResult<SpecialRegistrationStatusResponse> {
        Ok(self.sweep.lock().unwrap().clone())
    }

    async fn all_special_registration_status(
        &self,
        _student_ids: &[StudentId],
    ) -> SisResult<BatchStatusResponse> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.batch_sweep.lock().unwrap().clone())
    }

    async fn check_restrictions(
        &self,
        request: &CheckRestrictionsRequest,
    ) -> SisResult<CheckRestrictionsResponse> {
        self.restriction_requests.lock().unwrap().push(request.clone());
        Ok(self.restrictions.lock().unwrap().clone())
    }

    async fn submit_registration(
        &self,
        request: &OverrideRequest,
    ) -> SisResult<SubmitRegistrationResponse> {
        self.submitted_requests.lock().unwrap().push(request.clone());
        self.submit_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SisError::envelope("no scripted submitRegistration response"))
    }

    async fn cancel_registration_request(
        &self,
        _student_id: &StudentId,
        request_id: &RequestId,
    ) -> SisResult<bool> {
        self.cancelled.lock().unwrap().push(request_id.clone());
        Ok(true)
    }

    async fn update_requestor_notes(&self, _request: &UpdateNotesRequest) -> SisResult<bool> {
        Ok(true)
    }

    async fn fetch_enrollment(&self, student_id: &StudentId) -> SisResult<EnrollmentResponse> {
        self.enrollment
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SisError::envelope(format!("no enrollment scripted for {student_id}")))
    }

    async fn submit_enrollment(
        &self,
        request: &EnrollmentChangeRequest,
    ) -> SisResult<EnrollmentResultResponse> {
        self.submissions.lock().unwrap().push(request.clone());
        let scripted = self.enrollment_results.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| Self::synthesize_success(request)))
    }
}
