//! Request core and the typed verb wrappers.
//!
//! # Design
//! `ApiClient` keeps the build/parse split: `build_request` turns a
//! `RequestDescriptor` into an `HttpRequest`, `parse_response` turns an
//! `HttpResponse` into a JSON value or an `ApiError`. Both are pure. The
//! `request` method glues them around one `Transport::execute` call and is the
//! only place where failures are classified; everything layered on top passes
//! `ApiError` through unchanged.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::TransportConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Header overrides forwarded untouched by the verb wrappers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Everything needed to issue one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Path relative to the base URL.
    pub endpoint: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Asynchronous client for the backend API.
///
/// Cheap to clone; clones share the config and the transport.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<TransportConfig>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: TransportConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Client using the default `reqwest` transport.
    pub fn with_reqwest(config: TransportConfig) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::default()))
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Turn a descriptor into a concrete request.
    ///
    /// The default `Content-Type: application/json` header is replaced by an
    /// override with the same (case-insensitive) name; other overrides are
    /// appended in order.
    pub fn build_request(&self, descriptor: RequestDescriptor) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        for (name, value) in descriptor.options.headers {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
                Some(existing) => *existing = (name, value),
                None => headers.push((name, value)),
            }
        }

        let body = descriptor
            .body
            .map(|body| serde_json::to_string(&body))
            .transpose()
            .map_err(ApiError::unclassified)?;

        Ok(HttpRequest {
            method: descriptor.method,
            url: self.config.url_for(&descriptor.endpoint),
            headers,
            body,
        })
    }

    /// Issue one request and decode the successful body into `T`.
    #[instrument(skip_all, fields(method = descriptor.method.as_str(), endpoint = %descriptor.endpoint))]
    pub async fn request<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let request = self.build_request(descriptor)?;
        debug!(url = %request.url, "sending request");

        let response = self.transport.execute(request).await.map_err(|e| match e {
            TransportError::Connect(_) => ApiError::connectivity(e),
            TransportError::Other(_) => ApiError::unclassified(e),
        });
        let value = match response {
            Ok(response) => parse_response(response),
            Err(e) => Err(e),
        }
        .inspect_err(|e| debug!(kind = ?e.kind(), status = e.status(), error = %e, "request failed"))?;

        serde_json::from_value(value).map_err(ApiError::unclassified)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.request(RequestDescriptor::new(HttpMethod::Get, endpoint).options(options))
            .await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: Option<&B>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(HttpMethod::Post, endpoint, body, options).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: Option<&B>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(HttpMethod::Put, endpoint, body, options).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: Option<&B>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(HttpMethod::Patch, endpoint, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.request(RequestDescriptor::new(HttpMethod::Delete, endpoint).options(options))
            .await
    }

    async fn send_with_body<T, B>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut descriptor = RequestDescriptor::new(method, endpoint).options(options);
        if let Some(body) = body {
            descriptor = descriptor.body(serde_json::to_value(body).map_err(ApiError::unclassified)?);
        }
        self.request(descriptor).await
    }
}

/// Interpret a response: JSON or text body on success, `ApiError` otherwise.
///
/// A body is parsed as JSON only when the `Content-Type` says so. Other
/// bodies come back as a JSON string. An empty body is `null` whatever the
/// content type, so bodiless responses decode into `()`. A failing response
/// whose JSON body does not parse keeps the raw text as its body, so it is
/// still reported with its status.
pub fn parse_response(response: HttpResponse) -> Result<Value, ApiError> {
    let success = response.is_success();
    let is_json = response.is_json();
    let HttpResponse { status, body, .. } = response;

    let value = if body.is_empty() {
        Value::Null
    } else if is_json {
        match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(e) if success => return Err(ApiError::unclassified(e)),
            Err(_) => Value::String(body),
        }
    } else {
        Value::String(body)
    };

    if !success {
        return Err(ApiError::application(status, value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, NETWORK_ERROR_MESSAGE};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport that replays one canned outcome and records the request.
    struct Scripted {
        outcome: Mutex<Option<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(outcome: Result<HttpResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(outcome)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.outcome.lock().unwrap().take().expect("one request per script")
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    fn client_with(transport: Arc<Scripted>) -> ApiClient {
        ApiClient::new(TransportConfig::with_base_url("http://localhost:5000"), transport)
    }

    fn client() -> ApiClient {
        client_with(Scripted::new(Ok(json_response(200, "null"))))
    }

    #[test]
    fn build_request_sets_default_content_type() {
        let req = client()
            .build_request(RequestDescriptor::new(HttpMethod::Get, "/api/users"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:5000/api/users");
        assert_eq!(
            req.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_merges_header_overrides() {
        let options = RequestOptions::new()
            .header("content-type", "text/plain")
            .header("Authorization", "Bearer t");
        let req = client()
            .build_request(RequestDescriptor::new(HttpMethod::Post, "/api/users").options(options))
            .unwrap();
        assert_eq!(
            req.headers,
            vec![
                ("content-type".to_string(), "text/plain".to_string()),
                ("Authorization".to_string(), "Bearer t".to_string()),
            ]
        );
    }

    #[test]
    fn build_request_serializes_body() {
        let req = client()
            .build_request(RequestDescriptor::new(HttpMethod::Post, "/api/users").body(json!({"name": "Ann"})))
            .unwrap();
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Ann"}));
    }

    #[test]
    fn parse_response_returns_json_unchanged() {
        let body = json!({"id": 1, "nested": {"list": [1, 2, 3]}, "flag": null});
        let value = parse_response(json_response(200, &body.to_string())).unwrap();
        assert_eq!(value, body);
    }

    #[test]
    fn parse_response_returns_text_for_non_json() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: "pong".to_string(),
        };
        assert_eq!(parse_response(response).unwrap(), json!("pong"));
    }

    #[test]
    fn parse_response_maps_empty_text_to_null() {
        let response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        assert_eq!(parse_response(response).unwrap(), Value::Null);
    }

    #[test]
    fn parse_response_failure_carries_status_and_body() {
        let err = parse_response(json_response(422, r#"{"message":"name required"}"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.message(), "name required");
        assert_eq!(err.body(), Some(&json!({"message": "name required"})));
    }

    #[test]
    fn parse_response_failure_with_text_body_is_generic() {
        let response = HttpResponse {
            status: 503,
            headers: Vec::new(),
            body: "Service Unavailable".to_string(),
        };
        let err = parse_response(response).unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.message(), "HTTP error! status: 503");
        assert_eq!(err.body(), Some(&json!("Service Unavailable")));
    }

    #[test]
    fn parse_response_failure_with_unparsable_json_keeps_status() {
        let err = parse_response(json_response(502, "<html>Bad Gateway</html>")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.message(), "HTTP error! status: 502");
        assert_eq!(err.body(), Some(&json!("<html>Bad Gateway</html>")));

        let err = parse_response(json_response(401, "")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "HTTP error! status: 401");
        assert_eq!(err.body(), Some(&Value::Null));
    }

    #[test]
    fn parse_response_empty_json_success_is_null() {
        assert_eq!(parse_response(json_response(204, "")).unwrap(), Value::Null);
    }

    #[test]
    fn parse_response_bad_json_is_unclassified() {
        let err = parse_response(json_response(200, "not json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn request_decodes_typed_result() {
        let transport = Scripted::new(Ok(json_response(200, r#"[{"id":1},{"id":2}]"#)));
        let ids: Vec<Value> = client_with(transport.clone())
            .get("/api/users", RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].url, "http://localhost:5000/api/users");
    }

    #[tokio::test]
    async fn connect_failure_is_connectivity_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let transport = Scripted::new(Err(TransportError::Connect(Box::new(io))));
        let err = client_with(transport)
            .get::<Value>("/", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.status(), None);
        assert_eq!(err.message(), NETWORK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn other_transport_failure_is_unclassified() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "stream reset");
        let transport = Scripted::new(Err(TransportError::Other(Box::new(io))));
        let err = client_with(transport)
            .get::<Value>("/", RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert_eq!(err.message(), "stream reset");
    }

    #[tokio::test]
    async fn decode_failure_is_unclassified() {
        let transport = Scripted::new(Ok(json_response(200, r#"{"id":"seven"}"#)));
        let err = client_with(transport)
            .get::<Vec<u64>>("/api/users", RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn verbs_fix_method_and_body() {
        let cases: [(HttpMethod, bool); 5] = [
            (HttpMethod::Get, false),
            (HttpMethod::Post, true),
            (HttpMethod::Put, true),
            (HttpMethod::Patch, true),
            (HttpMethod::Delete, false),
        ];
        let payload = json!({"name": "Ann"});
        for (method, has_body) in cases {
            let transport = Scripted::new(Ok(json_response(200, "{}")));
            let api = client_with(transport.clone());
            let options = RequestOptions::new().header("X-Trace", "1");
            let _: Value = match method {
                HttpMethod::Get => api.get("/api/users/1", options).await,
                HttpMethod::Post => api.post("/api/users/1", Some(&payload), options).await,
                HttpMethod::Put => api.put("/api/users/1", Some(&payload), options).await,
                HttpMethod::Patch => api.patch("/api/users/1", Some(&payload), options).await,
                HttpMethod::Delete => api.delete("/api/users/1", options).await,
            }
            .unwrap();

            let seen = transport.seen.lock().unwrap();
            assert_eq!(seen[0].method, method);
            assert_eq!(seen[0].body.is_some(), has_body, "{}", method.as_str());
            assert!(seen[0].headers.contains(&("X-Trace".to_string(), "1".to_string())));
        }
    }

    #[tokio::test]
    async fn post_without_body_sends_none() {
        let transport = Scripted::new(Ok(json_response(201, "{}")));
        let _: Value = client_with(transport.clone())
            .post::<_, Value>("/api/users", None, RequestOptions::new())
            .await
            .unwrap();
        assert!(transport.seen.lock().unwrap()[0].body.is_none());
    }
}
