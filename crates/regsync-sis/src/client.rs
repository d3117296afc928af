//! SIS client trait and HTTP implementation.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use regsync_core::{RequestId, StudentId};

use crate::config::SisConfig;
use crate::error::{SisError, SisResult};
use crate::wire::{
    AckResponse, BatchStatusResponse, CheckRestrictionsRequest, CheckRestrictionsResponse,
    EligibilityResponse, EnrollmentChangeRequest, EnrollmentResponse, EnrollmentResultResponse,
    ResponseEnvelope, SpecialRegistrationStatusResponse, SubmitRegistrationResponse,
    UpdateNotesRequest,
};

use regsync_core::OverrideRequest;

/// Capability trait for the external student information system.
///
/// Each method is one request/response exchange. Implementations must
/// not cache responses: the SIS is the source of truth and callers
/// always want a fresh read.
#[async_trait]
pub trait SisClient: Send + Sync {
    /// Pre-flight eligibility query for one student.
    async fn check_eligibility(&self, student_id: &StudentId) -> SisResult<EligibilityResponse>;

    /// Fetch all outstanding override requests for one student.
    async fn special_registration_status(
        &self,
        student_id: &StudentId,
    ) -> SisResult<SpecialRegistrationStatusResponse>;

    /// Fetch outstanding override requests for a batch of students.
    ///
    /// Callers cap the batch size; the SIS enforces no paging here.
    async fn all_special_registration_status(
        &self,
        student_ids: &[StudentId],
    ) -> SisResult<BatchStatusResponse>;

    /// Validate a proposed set of adds/drops without applying it.
    async fn check_restrictions(
        &self,
        request: &CheckRestrictionsRequest,
    ) -> SisResult<CheckRestrictionsResponse>;

    /// Submit an override request for approval.
    async fn submit_registration(
        &self,
        request: &OverrideRequest,
    ) -> SisResult<SubmitRegistrationResponse>;

    /// Cancel a previously submitted override request.
    async fn cancel_registration_request(
        &self,
        student_id: &StudentId,
        request_id: &RequestId,
    ) -> SisResult<bool>;

    /// Attach or change the requestor note on an existing request
    /// without altering its lines.
    async fn update_requestor_notes(&self, request: &UpdateNotesRequest) -> SisResult<bool>;

    /// Fetch the student's current registration record.
    async fn fetch_enrollment(&self, student_id: &StudentId) -> SisResult<EnrollmentResponse>;

    /// Submit a real-time add/drop/keep action list.
    async fn submit_enrollment(
        &self,
        request: &EnrollmentChangeRequest,
    ) -> SisResult<EnrollmentResultResponse>;
}

/// HTTP implementation of [`SisClient`] over JSON.
#[derive(Clone)]
pub struct HttpSisClient {
    config: SisConfig,
    client: Client,
}

impl std::fmt::Debug for HttpSisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSisClient")
            .field("config", &self.config.redacted())
            .finish()
    }
}

impl HttpSisClient {
    /// Create a client from validated configuration.
    pub fn new(config: SisConfig) -> SisResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.read_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                SisError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Decode a response, mapping non-2xx statuses and non-success
    /// envelopes to hard errors carrying the raw body.
    async fn read_json<T>(&self, response: Response) -> SisResult<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SisError::from_reqwest(e, self.config.read_timeout_secs))?;

        if !status.is_success() {
            // 404 bodies from the SIS are often HTML; keep them short.
            let trimmed: String = body.chars().take(512).collect();
            return Err(SisError::Http {
                status: status.as_u16(),
                body: trimmed,
            });
        }

        let value: T = serde_json::from_str(&body)
            .map_err(|e| SisError::decode(format!("{e} in: {body}")))?;
        Ok(value)
    }

    fn check_envelope(&self, envelope: &ResponseEnvelope) -> SisResult<()> {
        if envelope.is_success() {
            Ok(())
        } else {
            Err(SisError::envelope(envelope.failure_message()))
        }
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> SisResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(path, "SIS GET");
        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| SisError::from_reqwest(e, self.config.read_timeout_secs))?;
        self.read_json(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> SisResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(path, "SIS POST");
        let response = self
            .client
            .post(&url)
            .query(&[("apiKey", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| SisError::from_reqwest(e, self.config.read_timeout_secs))?;
        self.read_json(response).await
    }
}

#[async_trait]
impl SisClient for HttpSisClient {
    #[instrument(skip(self), fields(student_id = %student_id))]
    async fn check_eligibility(&self, student_id: &StudentId) -> SisResult<EligibilityResponse> {
        let response: EligibilityResponse = self
            .get_json("checkEligibility", &[("studentId", student_id.as_str())])
            .await?;
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }

    #[instrument(skip(self), fields(student_id = %student_id))]
    async fn special_registration_status(
        &self,
        student_id: &StudentId,
    ) -> SisResult<SpecialRegistrationStatusResponse> {
        let response: SpecialRegistrationStatusResponse = self
            .get_json(
                "checkSpecialRegistrationStatus",
                &[("studentId", student_id.as_str())],
            )
            .await?;
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }

    #[instrument(skip(self, student_ids), fields(students = student_ids.len()))]
    async fn all_special_registration_status(
        &self,
        student_ids: &[StudentId],
    ) -> SisResult<BatchStatusResponse> {
        let query: Vec<(&str, &str)> = student_ids
            .iter()
            .map(|id| ("studentId", id.as_str()))
            .collect();
        let response: BatchStatusResponse = self
            .get_json("checkAllSpecialRegistrationStatus", &query)
            .await?;
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }

    #[instrument(skip(self, request), fields(student_id = %request.student_id))]
    async fn check_restrictions(
        &self,
        request: &CheckRestrictionsRequest,
    ) -> SisResult<CheckRestrictionsResponse> {
        let response: CheckRestrictionsResponse =
            self.post_json("checkRestrictions", request).await?;
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }

    #[instrument(skip(self, request), fields(student_id = %request.student_id))]
    async fn submit_registration(
        &self,
        request: &OverrideRequest,
    ) -> SisResult<SubmitRegistrationResponse> {
        let response: SubmitRegistrationResponse =
            self.post_json("submitRegistration", request).await?;
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }

    #[instrument(skip(self), fields(student_id = %student_id, request_id = %request_id))]
    async fn cancel_registration_request(
        &self,
        student_id: &StudentId,
        request_id: &RequestId,
    ) -> SisResult<bool> {
        let response: AckResponse = self
            .get_json(
                "cancelRegistrationRequestFromUniTime",
                &[
                    ("studentId", student_id.as_str()),
                    ("regRequestId", request_id.as_str()),
                ],
            )
            .await?;
        self.check_envelope(&response.envelope)?;
        Ok(response.success)
    }

    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    async fn update_requestor_notes(&self, request: &UpdateNotesRequest) -> SisResult<bool> {
        let response: AckResponse = self.post_json("updateRequestorNotes", request).await?;
        self.check_envelope(&response.envelope)?;
        Ok(response.success)
    }

    #[instrument(skip(self), fields(student_id = %student_id))]
    async fn fetch_enrollment(&self, student_id: &StudentId) -> SisResult<EnrollmentResponse> {
        let response: EnrollmentResponse = self
            .get_json("enrollment", &[("studentId", student_id.as_str())])
            .await?;
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }

    #[instrument(
        skip(self, request),
        fields(student_id = %request.student_id, actions = request.actions.len())
    )]
    async fn submit_enrollment(
        &self,
        request: &EnrollmentChangeRequest,
    ) -> SisResult<EnrollmentResultResponse> {
        let response: EnrollmentResultResponse = self.post_json("enrollment", request).await?;
        if let Some(exception) = &response.exception {
            warn!(exception = %exception, "SIS reported registration-wide exception");
        }
        self.check_envelope(&response.envelope)?;
        Ok(response)
    }
}
