use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::Value;

use crate::core::error::{TimeCampError, TimeCampResult};

pub const DEFAULT_BASE_URL: &str = "https://app.timecamp.com/third_party/api";

/// Body of an outbound request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// One call against the TimeCamp REST API, relative to the base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: Method::POST,
            body: RequestBody::Json(body),
            ..Self::get(path)
        }
    }

    pub fn put(path: &str, body: Value) -> Self {
        Self {
            method: Method::PUT,
            body: RequestBody::Json(body),
            ..Self::get(path)
        }
    }

    pub fn delete_form(path: &str, form: &[(&str, &str)]) -> Self {
        Self {
            method: Method::DELETE,
            body: RequestBody::Form(pairs(form)),
            ..Self::get(path)
        }
    }

    pub fn query(mut self, params: &[(&str, &str)]) -> Self {
        self.query.extend(pairs(params));
        self
    }
}

fn pairs(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Transport for TimeCamp API calls, already bound to a credential
///
/// Returns the decoded JSON body of a successful response, or the body as a
/// JSON string when it is not JSON. Non-2xx responses become `TimeCampError::Api`.
#[async_trait]
pub trait TimeCampApi: Send + Sync {
    async fn send(&self, request: ApiRequest) -> TimeCampResult<Value>;
}

/// Builds a credential-bound transport for a single tool call
pub trait ApiConnector: Send + Sync {
    fn connect(&self, token: &str) -> TimeCampResult<Arc<dyn TimeCampApi>>;
}

/// Build a reqwest client for the TimeCamp API
pub fn build_client(timeout: Duration) -> TimeCampResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mcp-server-timecamp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TimeCampError::Config {
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// Shares one connection pool across calls; credentials are attached per call.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: Client,
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: &str, timeout: Duration) -> TimeCampResult<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ApiConnector for HttpConnector {
    fn connect(&self, token: &str) -> TimeCampResult<Arc<dyn TimeCampApi>> {
        Ok(Arc::new(HttpTimeCampApi::new(
            self.http.clone(),
            &self.base_url,
            token,
        )?))
    }
}

/// reqwest-backed TimeCamp transport
pub struct HttpTimeCampApi {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpTimeCampApi {
    pub fn new(http: Client, base_url: &str, token: &str) -> TimeCampResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TimeCampError::MissingCredential);
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl TimeCampApi for HttpTimeCampApi {
    async fn send(&self, request: ApiRequest) -> TimeCampResult<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(form) => builder.form(form),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                "TimeCamp {} {} returned status {}",
                request.method,
                request.path,
                status.as_u16()
            );
            return Err(TimeCampError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_body(&body))
    }
}

/// Decode a response body, keeping non-JSON acknowledgments as plain strings
pub fn decode_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::{ApiConnector, ApiRequest, TimeCampApi};
    use crate::core::error::{TimeCampError, TimeCampResult};

    /// Scripted transport that records every request it receives
    #[derive(Default)]
    pub struct MockApi {
        responses: Mutex<VecDeque<TimeCampResult<Value>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockApi {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn respond(&self, value: Value) -> &Self {
            self.responses.lock().unwrap().push_back(Ok(value));
            self
        }

        pub fn fail(&self, status: u16, body: &str) -> &Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(TimeCampError::Api {
                    status,
                    body: body.to_string(),
                }));
            self
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TimeCampApi for MockApi {
        async fn send(&self, request: ApiRequest) -> TimeCampResult<Value> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    /// Hands out the same mock for every credential and remembers the tokens used
    pub struct MockConnector {
        pub api: Arc<MockApi>,
        pub tokens: Mutex<Vec<String>>,
    }

    impl MockConnector {
        pub fn new(api: Arc<MockApi>) -> Arc<Self> {
            Arc::new(Self {
                api,
                tokens: Mutex::new(Vec::new()),
            })
        }
    }

    impl ApiConnector for MockConnector {
        fn connect(&self, token: &str) -> TimeCampResult<Arc<dyn TimeCampApi>> {
            if token.trim().is_empty() {
                return Err(TimeCampError::MissingCredential);
            }
            self.tokens.lock().unwrap().push(token.to_string());
            Ok(self.api.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::TimeCampClient;
    use serde_json::json;

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("/entries").query(&[("from", "2025-06-01"), ("to", "2025-06-30")]);
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/entries");
        assert_eq!(
            req.query,
            vec![
                ("from".to_string(), "2025-06-01".to_string()),
                ("to".to_string(), "2025-06-30".to_string())
            ]
        );
        assert_eq!(req.body, RequestBody::Empty);

        let req = ApiRequest::delete_form("/entries", &[("id", "1"), ("service", "timecamp-mcp")]);
        assert_eq!(req.method, Method::DELETE);
        assert!(matches!(req.body, RequestBody::Form(ref form) if form.len() == 2));
    }

    #[test]
    fn test_blank_token_is_a_configuration_error() {
        let http = build_client(Duration::from_secs(5)).unwrap();

        let result = HttpTimeCampApi::new(http.clone(), DEFAULT_BASE_URL, "   ");
        assert!(matches!(result, Err(TimeCampError::MissingCredential)));

        assert!(HttpTimeCampApi::new(http, DEFAULT_BASE_URL, "abc").is_ok());
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("{\"ok\":true}"), json!({ "ok": true }));
        assert_eq!(decode_body("deleted"), json!("deleted"));
    }

    /// What the stub server saw of one request
    #[derive(Debug, Clone)]
    struct Received {
        method: String,
        path: String,
        query: Option<String>,
        authorization: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    /// Serve `reply` with `status` for every request and record what arrives
    async fn stub_server(
        status: u16,
        reply: &'static str,
    ) -> (String, Arc<std::sync::Mutex<Vec<Received>>>) {
        use axum::http::{HeaderMap, StatusCode, Uri, header as h};

        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = received.clone();
        let status = StatusCode::from_u16(status).unwrap();

        let app = axum::Router::new().fallback(
            move |method: axum::http::Method, uri: Uri, headers: HeaderMap, body: String| {
                let recorder = recorder.clone();
                async move {
                    let header = |name: h::HeaderName| {
                        headers
                            .get(name)
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string)
                    };
                    recorder.lock().unwrap().push(Received {
                        method: method.to_string(),
                        path: uri.path().to_string(),
                        query: uri.query().map(str::to_string),
                        authorization: header(h::AUTHORIZATION),
                        content_type: header(h::CONTENT_TYPE),
                        body,
                    });
                    (status, reply)
                }
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/third_party/api", addr), received)
    }

    fn client_for(base_url: &str) -> TimeCampClient {
        let connector = HttpConnector::new(base_url, Duration::from_secs(5)).unwrap();
        TimeCampClient::new(connector.connect("tok").unwrap())
    }

    #[tokio::test]
    async fn test_list_tasks_over_http() {
        let (base_url, received) = stub_server(
            200,
            r#"{"7":{"task_id":"7","parent_id":"0","name":"Ops","level":"1","note":null,"archived":"0"}}"#,
        )
        .await;

        let envelope = client_for(&base_url).list_tasks().await;

        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()[0]["name"], "Ops");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].method, "GET");
        assert_eq!(received[0].path, "/third_party/api/tasks");
        assert_eq!(received[0].query.as_deref(), Some("ignoreAdminRights=1"));
        assert_eq!(received[0].authorization.as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_create_entry_sends_json() {
        let (base_url, received) = stub_server(200, r#"{"entry_id":101}"#).await;

        let envelope = client_for(&base_url)
            .create_entry("2025-06-21 09:00", "2025-06-21 09:43", "emails", None)
            .await;

        assert!(envelope.success);
        assert_eq!(envelope.data, Some(json!({ "entry_id": 101 })));

        let received = received.lock().unwrap();
        assert_eq!(received[0].method, "POST");
        assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(&received[0].body).unwrap();
        assert_eq!(body["duration"], 2580);
        assert_eq!(body["service"], "timecamp-mcp");
    }

    #[tokio::test]
    async fn test_delete_entry_form_and_status_error() {
        let (base_url, received) = stub_server(404, "gone").await;

        let envelope = client_for(&base_url).delete_entry("12345").await;

        assert!(!envelope.success);
        assert_eq!(
            envelope.error.as_deref(),
            Some("TimeCamp API request failed with status 404: gone")
        );

        let received = received.lock().unwrap();
        assert_eq!(received[0].method, "DELETE");
        assert_eq!(received[0].path, "/third_party/api/entries");
        assert_eq!(received[0].authorization.as_deref(), Some("Bearer tok"));
        assert_eq!(
            received[0].content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(received[0].body, "id=12345&service=timecamp-mcp");
    }

    #[tokio::test]
    async fn test_plain_text_acknowledgment_is_kept() {
        let (base_url, _) = stub_server(200, "Entry deleted").await;

        let api = HttpConnector::new(&base_url, Duration::from_secs(5))
            .unwrap()
            .connect("tok")
            .unwrap();
        let value = api
            .send(ApiRequest::delete_form("/entries", &[("id", "1")]))
            .await
            .unwrap();

        assert_eq!(value, json!("Entry deleted"));
    }

    #[test]
    fn test_connector_strips_trailing_slash() {
        let connector = HttpConnector::new("https://example.test/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(connector.base_url, "https://example.test/api");
    }
}
