use junkan_api::{
    map_error, openapi_v1_spec, status_for, ApiError, ApiErrorCode, RouteAccess,
    API_ERROR_SCHEMA_REF, ROUTES,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;

#[test]
fn every_error_code_has_a_distinct_status_family() {
    let expected = [
        (ApiErrorCode::InvalidRequest, 400),
        (ApiErrorCode::ValidationFailed, 422),
        (ApiErrorCode::InvalidInviteCode, 400),
        (ApiErrorCode::Unauthenticated, 401),
        (ApiErrorCode::InvalidCredentials, 401),
        (ApiErrorCode::EmailNotConfirmed, 403),
        (ApiErrorCode::AccountPending, 403),
        (ApiErrorCode::AccountSuspended, 403),
        (ApiErrorCode::Forbidden, 403),
        (ApiErrorCode::NotFound, 404),
        (ApiErrorCode::Conflict, 409),
        (ApiErrorCode::PayloadTooLarge, 413),
        (ApiErrorCode::UnsupportedMediaType, 415),
        (ApiErrorCode::RateLimited, 429),
        (ApiErrorCode::NotReady, 503),
        (ApiErrorCode::Internal, 500),
    ];
    assert_eq!(expected.len(), ApiErrorCode::ALL.len());
    for (code, status) in expected {
        assert_eq!(status_for(code), status, "{}", code.as_str());
    }
    let mapping = map_error(&ApiError::new(ApiErrorCode::Conflict, "dup", json!({})));
    assert_eq!(mapping.status_code, 409);
    assert_eq!(mapping.schema_ref, API_ERROR_SCHEMA_REF);
}

#[test]
fn openapi_documents_every_route_once() {
    let spec = openapi_v1_spec();
    assert_eq!(spec["openapi"], "3.0.3");
    let paths = spec["paths"].as_object().expect("paths");

    let mut seen = BTreeSet::new();
    for doc in ROUTES {
        assert!(
            seen.insert((doc.method, doc.path)),
            "duplicate route {} {}",
            doc.method,
            doc.path
        );
        let op = &paths[doc.path][doc.method.to_ascii_lowercase()];
        assert!(op.is_object(), "{} {} missing", doc.method, doc.path);
        assert_eq!(
            op["responses"].get("401").is_some(),
            doc.access != RouteAccess::Public,
            "{} {}",
            doc.method,
            doc.path
        );
    }
    let documented: usize = paths
        .values()
        .map(|item| item.as_object().map_or(0, |m| m.len()))
        .sum();
    assert_eq!(documented, ROUTES.len());
}

#[test]
fn openapi_error_schema_lists_all_codes() {
    let spec = openapi_v1_spec();
    let codes: Vec<&str> = spec["components"]["schemas"]["ApiErrorCode"]["enum"]
        .as_array()
        .expect("enum")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    let expected: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    assert_eq!(codes, expected);
    assert_eq!(
        spec["components"]["schemas"]["ApiError"]["additionalProperties"],
        Value::Bool(false)
    );
}
