//! Error module tests

use crate::error::{Error, Result};

#[test]
fn test_transport_error() {
    let error = Error::Transport("connection refused".to_string());
    assert_eq!(error.code(), "E100");
    assert_eq!(
        error.suggestion(),
        Some("mastery config get api.base_url".to_string())
    );
    assert!(error.to_string().contains("connection refused"));
    assert!(error.is_transport());
    assert!(!error.is_shape());
}

#[test]
fn test_http_not_found_error() {
    let error = Error::Http {
        status: 404,
        message: "Course not found".to_string(),
    };
    assert_eq!(error.code(), "E101");
    assert!(error.suggestion().unwrap().contains("mastery courses list"));
    assert_eq!(error.to_string(), "HTTP 404: Course not found");
    assert!(error.is_transport());
}

#[test]
fn test_http_server_error() {
    let error = Error::Http {
        status: 503,
        message: "unavailable".to_string(),
    };
    assert_eq!(
        error.suggestion(),
        Some("The server failed; retry the command".to_string())
    );

    let error = Error::Http {
        status: 409,
        message: "already enrolled".to_string(),
    };
    assert_eq!(error.suggestion(), None);
}

#[test]
fn test_missing_field_error() {
    let error = Error::MissingField {
        entity: "question",
        field: "question_type",
    };
    assert_eq!(error.code(), "E200");
    assert!(error.to_string().contains("question"));
    assert!(error.to_string().contains("question_type"));
    assert!(error.is_shape());
    assert!(!error.is_transport());
}

#[test]
fn test_invalid_payload_error() {
    let error = Error::InvalidPayload("unknown question type 'essay'".to_string());
    assert_eq!(error.code(), "E201");
    assert!(error.is_shape());
}

#[test]
fn test_variant_mismatch_error() {
    let error = Error::VariantMismatch {
        expected: "multiple_choice",
        found: "calculation",
    };
    assert_eq!(error.code(), "E300");
    assert_eq!(
        error.to_string(),
        "Answer of type 'calculation' cannot answer a 'multiple_choice' question"
    );
    assert!(!error.is_shape());
}

#[test]
fn test_option_out_of_range_error() {
    let error = Error::OptionOutOfRange {
        index: 4,
        available: 3,
    };
    assert_eq!(error.code(), "E301");
    assert!(error.to_string().contains("3 options"));
}

#[test]
fn test_remaining_codes() {
    assert_eq!(
        Error::CacheTypeMismatch {
            key: "[\"courses\"]".to_string()
        }
        .code(),
        "E400"
    );
    assert_eq!(Error::InvalidInput("empty".to_string()).code(), "E800");

    let config = Error::ConfigError("bad url".to_string());
    assert_eq!(config.code(), "E600");
    assert_eq!(config.suggestion(), Some("mastery config list".to_string()));
}

#[test]
fn test_from_serde_json_error() {
    let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: Error = err.into();
    assert_eq!(error.code(), "E201");
}

#[test]
fn test_errors_are_clone() {
    let error = Error::Transport("timeout".to_string());
    let shared = error.clone();
    assert_eq!(error, shared);
}

#[test]
fn test_result_alias() {
    fn parse(input: &str) -> Result<u32> {
        input
            .parse()
            .map_err(|_| Error::InvalidInput(input.to_string()))
    }

    assert_eq!(parse("3"), Ok(3));
    assert_eq!(parse("x"), Err(Error::InvalidInput("x".to_string())));
}
