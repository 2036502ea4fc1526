//! Request descriptors.
//!
//! A [`RequestOptions`] is built per call and never persisted.  Bodies
//! are kept in a re-buildable form so the gateway can resend the exact
//! same request after renewing credentials.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use crate::error::SdkError;

/// Content type attached to JSON-ish bodies when the caller set none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// A JSON document.
    Json(serde_json::Value),
    /// A pre-serialised body string.
    Raw(String),
    /// Opaque bytes (file upload); never given a default content type.
    Binary {
        /// Payload.
        bytes: Vec<u8>,
        /// Content type, if the caller knows it.
        content_type: Option<String>,
    },
    /// A multipart form; the transport supplies the boundary header.
    Multipart(Vec<MultipartPart>),
}

impl RequestBody {
    /// Whether the gateway may attach [`DEFAULT_CONTENT_TYPE`].
    pub fn takes_default_content_type(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Raw(_))
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    /// Form field name.
    pub name: String,
    /// File name, for file fields.
    pub file_name: Option<String>,
    /// MIME type of the part.
    pub content_type: Option<String>,
    /// Part content.
    pub bytes: Vec<u8>,
}

impl MultipartPart {
    /// Plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            bytes: value.into().into_bytes(),
        }
    }

    /// File field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type,
            bytes,
        }
    }
}

/// Method, headers and body of one gateway call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// Caller-supplied headers; the gateway never overrides these.
    pub headers: HeaderMap,
    /// Optional body.
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    /// Empty request with the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// `GET` request.
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// `POST` request.
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// `PUT` request.
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    /// `PATCH` request.
    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    /// `DELETE` request.
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, SdkError> {
        self.body = Some(RequestBody::Json(serde_json::to_value(value)?));
        Ok(self)
    }

    /// Set an arbitrary body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, SdkError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| SdkError::Config(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// Per-call gateway behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Renew credentials and retry once on a 401.
    pub auto_refresh: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { auto_refresh: true }
    }
}

impl SendOptions {
    /// Return a 401 as-is instead of renewing.
    pub fn without_refresh() -> Self {
        Self {
            auto_refresh: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn only_json_like_bodies_take_the_default_content_type() {
        assert!(RequestBody::Json(serde_json::json!({})).takes_default_content_type());
        assert!(RequestBody::Raw("{}".into()).takes_default_content_type());
        assert!(!RequestBody::Binary {
            bytes: vec![1, 2],
            content_type: None
        }
        .takes_default_content_type());
        assert!(!RequestBody::Multipart(vec![MultipartPart::text("a", "b")])
            .takes_default_content_type());
    }

    #[test]
    fn builder_sets_method_body_and_headers() {
        let opts = RequestOptions::patch()
            .json(&serde_json::json!({"read": true}))
            .unwrap()
            .header(AUTHORIZATION, "Bearer custom")
            .unwrap();
        assert_eq!(opts.method, Method::PATCH);
        assert!(matches!(opts.body, Some(RequestBody::Json(_))));
        assert_eq!(opts.headers[AUTHORIZATION], "Bearer custom");
    }

    #[test]
    fn invalid_header_value_is_a_config_error() {
        let err = RequestOptions::get()
            .header(AUTHORIZATION, "bad\nvalue")
            .unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn auto_refresh_defaults_on() {
        assert!(SendOptions::default().auto_refresh);
        assert!(!SendOptions::without_refresh().auto_refresh);
    }
}
