//! Integration tests for the HTTP SIS client using wiremock.
//!
//! These tests verify the client against a mock SIS, covering the API
//! key query parameter, envelope handling, HTTP failures, timeouts, and
//! the JSON shapes of each endpoint.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use regsync_core::{
    Change, ChangeOperation, CompletionStatus, CourseId, Crn, OverrideRequest, RequestId, Status,
    StudentId,
};
use regsync_sis::wire::{
    CheckRestrictionsRequest, EnrollmentAction, EnrollmentActionKind, EnrollmentChangeRequest,
    RestrictionChanges, UpdateNotesRequest,
};
use regsync_sis::{HttpSisClient, SisClient, SisConfig, SisError};

fn client_for(server: &MockServer) -> HttpSisClient {
    HttpSisClient::new(SisConfig::new(server.uri(), "test-key")).unwrap()
}

#[tokio::test]
async fn test_check_eligibility_sends_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/checkEligibility"))
        .and(query_param("apiKey", "test-key"))
        .and(query_param("studentId", "A1234567"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "canEnroll": true,
            "canRequestOverrides": true,
            "allowedOverrides": ["TIME-CNFLT", "CLOS-OVR"],
            "maxCredit": 18.0
        })))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .check_eligibility(&StudentId::from("A1234567"))
        .await
        .unwrap();
    assert!(response.can_enroll);
    assert!(response.can_request_overrides);
    assert_eq!(response.allowed_overrides.len(), 2);
    assert_eq!(response.max_credit, Some(18.0));
}

#[tokio::test]
async fn test_envelope_failure_is_hard_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/checkEligibility"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILURE",
            "message": "term is not open for registration"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .check_eligibility(&StudentId::from("A1"))
        .await
        .unwrap_err();
    match err {
        SisError::Envelope { message } => {
            assert!(message.contains("term is not open"));
        }
        other => panic!("expected envelope error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_carries_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/checkSpecialRegistrationStatus"))
        .respond_with(ResponseTemplate::new(503).set_body_string("scheduled maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .special_registration_status(&StudentId::from("A1"))
        .await
        .unwrap_err();
    match err {
        SisError::Http { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("maintenance"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/enrollment"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_enrollment(&StudentId::from("A1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SisError::Decode { .. }));
}

#[tokio::test]
async fn test_read_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/enrollment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"studentId": "A1", "lines": []}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client =
        HttpSisClient::new(SisConfig::new(server.uri(), "test-key").with_read_timeout(1)).unwrap();
    let err = client
        .fetch_enrollment(&StudentId::from("A1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SisError::Timeout { timeout_secs: 1 }));
}

#[tokio::test]
async fn test_submit_registration_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/submitRegistration"))
        .and(query_param("apiKey", "test-key"))
        .and(body_partial_json(json!({"studentId": "A1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "requests": [{
                "requestId": "req-42",
                "studentId": "A1",
                "changes": [{
                    "course": "MATH 101",
                    "crn": "12345",
                    "operation": "add",
                    "status": "pending"
                }],
                "completion": "inProgress"
            }]
        })))
        .mount(&server)
        .await;

    let request = OverrideRequest::new(
        StudentId::from("A1"),
        vec![Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::Add,
        )],
    );
    let response = client_for(&server)
        .submit_registration(&request)
        .await
        .unwrap();
    assert_eq!(response.requests.len(), 1);
    let stored = &response.requests[0];
    assert_eq!(stored.request_id, Some(RequestId::from("req-42")));
    assert_eq!(stored.changes[0].status, Some(Status::Pending));
    assert_eq!(stored.completion, CompletionStatus::InProgress);
}

#[tokio::test]
async fn test_check_restrictions_reports_problems() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/checkRestrictions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "problems": [
                {"crn": "54321", "code": "TIME", "message": "time conflict"},
                {"code": "MAXI", "message": "credit limit exceeded"}
            ],
            "maxCredit": 19.0,
            "denied": ["99999"]
        })))
        .mount(&server)
        .await;

    let request = CheckRestrictionsRequest {
        student_id: StudentId::from("A1"),
        term: "202710".into(),
        campus: "PWL".into(),
        mode: "REG".to_string(),
        changes: RestrictionChanges {
            add: vec![Crn::from("54321")],
            drop: vec![],
        },
    };
    let response = client_for(&server)
        .check_restrictions(&request)
        .await
        .unwrap();
    assert_eq!(response.problems.len(), 2);
    assert_eq!(response.problems[0].crn, Some(Crn::from("54321")));
    assert_eq!(response.problems[1].crn, None);
    assert_eq!(response.max_credit, Some(19.0));
    assert_eq!(response.denied, vec![Crn::from("99999")]);
}

#[tokio::test]
async fn test_cancel_and_note_update_acks() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cancelRegistrationRequestFromUniTime"))
        .and(query_param("studentId", "A1"))
        .and(query_param("regRequestId", "req-42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "success": true})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/updateRequestorNotes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "success": true})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client
        .cancel_registration_request(&StudentId::from("A1"), &RequestId::from("req-42"))
        .await
        .unwrap());
    assert!(client
        .update_requestor_notes(&UpdateNotesRequest {
            student_id: StudentId::from("A1"),
            request_id: RequestId::from("req-42"),
            note: "please approve before Friday".to_string(),
        })
        .await
        .unwrap());
}

#[tokio::test]
async fn test_enrollment_submit_and_exception() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/enrollment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "lines": [
                {"crn": "12345", "registered": true, "errors": []},
                {"crn": "54321", "registered": false,
                 "errors": [{"code": "CLOS", "message": "section full"}]}
            ]
        })))
        .mount(&server)
        .await;

    let request = EnrollmentChangeRequest {
        student_id: StudentId::from("A1"),
        term: "202710".into(),
        campus: "PWL".into(),
        actions: vec![
            EnrollmentAction::new(EnrollmentActionKind::Keep, Crn::from("12345")),
            EnrollmentAction::new(EnrollmentActionKind::Add, Crn::from("54321")),
        ],
        conditional_add_drop: false,
    };
    let response = client_for(&server)
        .submit_enrollment(&request)
        .await
        .unwrap();
    assert_eq!(response.lines.len(), 2);
    assert!(response.lines[0].registered);
    assert_eq!(response.lines[1].errors[0].code, "CLOS");
    assert!(response.exception.is_none());
}

#[tokio::test]
async fn test_batch_status_query_repeats_student_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/checkAllSpecialRegistrationStatus"))
        .and(query_param("apiKey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "requests": [
                {"requestId": "r1", "studentId": "A1", "changes": [], "completion": "completed"},
                {"requestId": "r2", "changes": [], "completion": "inProgress"}
            ]
        })))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .all_special_registration_status(&[StudentId::from("A1"), StudentId::from("A2")])
        .await
        .unwrap();
    assert_eq!(response.requests.len(), 2);
    assert_eq!(response.requests[0].student_id, Some(StudentId::from("A1")));
    assert!(response.requests[1].student_id.is_none());
}
