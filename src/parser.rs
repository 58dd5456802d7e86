//! Decoding and validation of raw response bodies.

use crate::client::PyLoadError;
use crate::client::PyLoadError::Parser;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decodes `body` into the expected response type.
///
/// Both malformed JSON and JSON of the wrong shape end up as
/// [`PyLoadError::Parser`].
pub(crate) fn parse<T>(body: &str, context: &str) -> Result<T, PyLoadError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| Parser {
        context: context.to_string(),
        source: Some(e),
    })
}

/// Checks that `body` is valid JSON without caring about its content
pub(crate) fn expect_json(body: &str, context: &str) -> Result<(), PyLoadError> {
    parse::<Value>(body, context).map(|_| ())
}

/// Whether a response says the session cookie is missing, invalid or expired.
///
/// pyLoad answers with HTTP 401, but a body of the form `{"status": 401}` or
/// `{"code": 401}` delivered with HTTP 200 is treated the same way.
pub(crate) fn is_unauthorized(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::UNAUTHORIZED {
        return true;
    }
    if !status.is_success() {
        return false;
    }

    let unauthorized = u64::from(StatusCode::UNAUTHORIZED.as_u16());
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["status", "code"]
            .iter()
            .filter_map(|key| map.get(*key))
            .any(|value| value.as_u64() == Some(unauthorized)),
        _ => false,
    }
}

/// Whether a decoded login body means the credentials were rejected
pub(crate) fn is_rejected_login(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(accepted) => !accepted,
        Value::Object(map) => {
            map.is_empty() || map.get("authenticated").and_then(Value::as_bool) == Some(false)
        }
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StatusServerResponse;
    use serde_json::json;

    #[test]
    fn test_parse_status() {
        let status: StatusServerResponse = parse(
            r#"{"pause":false,"active":2,"queue":5,"speed":1048576}"#,
            "status",
        )
        .unwrap();
        assert!(!status.pause);
        assert_eq!(status.active, 2);
        assert_eq!(status.queue, 5);
        assert_eq!(status.speed, 1_048_576.0);
    }

    #[test]
    fn test_parse_errors() {
        let result = parse::<StatusServerResponse>("not json", "status");
        assert!(matches!(result, Err(PyLoadError::Parser { .. })));

        let result = parse::<StatusServerResponse>(r#"{"pause":false,"active":2"#, "status");
        assert!(matches!(result, Err(PyLoadError::Parser { .. })));

        // valid JSON, missing the queue field
        let result =
            parse::<StatusServerResponse>(r#"{"pause":false,"active":2,"speed":1}"#, "status");
        assert!(matches!(result, Err(PyLoadError::Parser { .. })));

        // valid JSON, wrong type
        let result = parse::<u64>(r#""lots""#, "free space");
        assert!(matches!(result, Err(PyLoadError::Parser { .. })));
    }

    #[test]
    fn test_expect_json() {
        assert!(expect_json("null", "pause").is_ok());
        assert!(expect_json("true", "pause").is_ok());
        assert!(expect_json("", "pause").is_err());
        assert!(expect_json("<html>", "pause").is_err());
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(is_unauthorized(StatusCode::UNAUTHORIZED, ""));
        assert!(is_unauthorized(
            StatusCode::OK,
            r#"{"status":401,"error":"Unauthorized"}"#
        ));
        assert!(is_unauthorized(StatusCode::OK, r#"{"code":401}"#));
        assert!(!is_unauthorized(StatusCode::OK, r#"{"pause":false}"#));
        assert!(!is_unauthorized(StatusCode::OK, "401"));
        assert!(!is_unauthorized(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"code":401}"#
        ));
    }

    #[test]
    fn test_is_rejected_login() {
        assert!(is_rejected_login(&json!(false)));
        assert!(is_rejected_login(&json!(null)));
        assert!(is_rejected_login(&json!({})));
        assert!(is_rejected_login(&json!({"authenticated": false})));
        assert!(is_rejected_login(&json!(0)));
        assert!(!is_rejected_login(&json!(1)));
        assert!(!is_rejected_login(&json!({"authenticated": true, "name": "u"})));
    }
}
