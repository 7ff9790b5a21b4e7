// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use ark_lottery::error::{LotteryError, REQUEST_TOO_FAST};

#[test]
fn test_error_display_messages() {
    let errors = vec![
        LotteryError::rejected("bad response"),
        LotteryError::Jsonp("missing '('".to_string()),
        LotteryError::InvalidHeader("Cookie".to_string()),
        LotteryError::Config("no account".to_string()),
        LotteryError::Internal("client".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_rejected_displays_message_verbatim() {
    let error = LotteryError::rejected("quota used up");
    assert_eq!(error.to_string(), "quota used up");
}

#[test]
fn test_request_too_fast_detection() {
    assert!(LotteryError::rejected(REQUEST_TOO_FAST).is_request_too_fast());
    assert!(!LotteryError::rejected("something else").is_request_too_fast());
    assert!(!LotteryError::Jsonp(REQUEST_TOO_FAST.to_string()).is_request_too_fast());
}

#[test]
fn test_hints() {
    assert!(!LotteryError::rejected("x").hint().is_empty());
    assert!(LotteryError::Config("x".to_string()).hint().is_empty());
}

#[test]
fn test_json_error_conversion() {
    let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: LotteryError = parse_error.into();
    assert!(format!("{}", error).starts_with("JSON error"));
}
