//! JSON responses for rejected requests.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Response;
use http_body_util::Full;
use serde::Serialize;

use crate::error::Rejection;

/// Body of every short-circuited request.
#[derive(Debug, Serialize)]
pub struct RejectionBody {
    pub message: String,
    pub result: Option<serde_json::Value>,
    pub success: bool,
}

impl From<&Rejection> for RejectionBody {
    fn from(rejection: &Rejection) -> Self {
        Self {
            message: rejection.message(),
            result: None,
            success: false,
        }
    }
}

impl RejectionBody {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Rejection {
    /// Render as `{message, result: null, success: false}` with the mapped status.
    pub fn to_response(&self) -> Response<Full<Bytes>> {
        let body = RejectionBody::from(self)
            .to_json()
            .expect("rejection body is plain strings and a bool");
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_rejection_response_shape() {
        let response = Rejection::AuthMissing.to_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_invalid_token_is_unauthorized() {
        let response = Rejection::AuthInvalid("InvalidSignature".into()).to_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_body_to_json() {
        let body = RejectionBody::from(&Rejection::SignatureInvalid);
        assert_eq!(
            body.to_json().unwrap(),
            r#"{"message":"Invalid signature","result":null,"success":false}"#
        );
    }

    #[test]
    fn test_body_matches_serialized_struct() {
        let body = RejectionBody::from(&Rejection::AuthForbidden);
        let from_serde = serde_json::to_value(&body).unwrap();
        let from_json: serde_json::Value = serde_json::from_str(&body.to_json().unwrap()).unwrap();
        assert_eq!(from_serde, from_json);
        assert_eq!(from_json["result"], serde_json::Value::Null);
    }

    #[test]
    fn test_body_never_leaks_reason() {
        let body = RejectionBody::from(&Rejection::AuthInvalid("ExpiredSignature".into()));
        assert!(!body.to_json().unwrap().contains("Expired"));
        assert_eq!(body.message, "Invalid token");
    }
}
