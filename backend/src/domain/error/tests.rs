//! Tests for domain error construction and serialisation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn partial_borrow() -> DomainError {
    DomainError::partial_borrow_failure("claim could not be released")
        .with_details(json!({"bookId": 1, "reconciled": false}))
}

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = DomainError::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = DomainError::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
#[case(DomainError::book_unavailable("on loan"), ErrorCode::BookUnavailable)]
#[case(DomainError::already_returned("closed"), ErrorCode::AlreadyReturned)]
#[case(DomainError::store_failure("disk"), ErrorCode::StoreFailure)]
#[case(DomainError::store_timeout("slow"), ErrorCode::StoreTimeout)]
#[case(DomainError::partial_return_failure("split"), ErrorCode::PartialReturnFailure)]
#[case(DomainError::unauthorized("who"), ErrorCode::Unauthorized)]
#[case(DomainError::forbidden("no"), ErrorCode::Forbidden)]
#[case(DomainError::not_found("gone"), ErrorCode::NotFound)]
#[case(DomainError::internal("boom"), ErrorCode::InternalError)]
fn convenience_constructors_set_codes(#[case] err: DomainError, #[case] expected: ErrorCode) {
    assert_eq!(err.code(), expected);
}

#[rstest]
fn partial_failures_are_flagged(partial_borrow: DomainError) {
    assert!(partial_borrow.is_partial_failure());
    assert!(DomainError::partial_return_failure("split").is_partial_failure());
    assert!(!DomainError::book_unavailable("on loan").is_partial_failure());
}

#[rstest]
fn display_uses_message(partial_borrow: DomainError) {
    assert_eq!(partial_borrow.to_string(), "claim could not be released");
}

#[rstest]
fn serialises_with_snake_case_codes(partial_borrow: DomainError) {
    let value = serde_json::to_value(&partial_borrow).expect("error serialises");
    assert_eq!(value["code"], "partial_borrow_failure");
    assert_eq!(value["details"]["bookId"], 1);
}

#[rstest]
fn omits_absent_details() {
    let value = serde_json::to_value(DomainError::not_found("gone")).expect("error serialises");
    assert!(value.get("details").is_none());
}

#[rstest]
fn deserialising_rejects_blank_messages() {
    let payload = json!({"code": "not_found", "message": "  "});
    let result = serde_json::from_value::<DomainError>(payload);
    assert!(result.is_err());
}

#[rstest]
fn deserialising_restores_details(partial_borrow: DomainError) {
    let value = serde_json::to_value(&partial_borrow).expect("error serialises");
    let restored: DomainError = serde_json::from_value(value).expect("error deserialises");
    assert_eq!(restored, partial_borrow);
}
