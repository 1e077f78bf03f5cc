//! Talking to the computation service over HTTP.
//!
//! The lifecycle and routing code only sees the [`ComputationApi`] trait. The
//! provided [`Client`] implements it on top of any [`HttpBackend`]; a backend
//! for `reqwest` is available with `--features reqwest-client`.

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{Computation, ComputationDefinition, Content, DataObject, ResultEntity};

#[cfg(feature = "reqwest-client")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest-client")))]
mod reqwest;
#[cfg(feature = "reqwest-client")]
pub use self::reqwest::new_client;

/// Structured body of a `403 Forbidden` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl fmt::Display for ForbiddenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Unexpected HTTP status or malformed envelope. These are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("forbidden: {0}")]
    Forbidden(ForbiddenPayload),

    #[error("unexpected response from the service: status {status}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("failed to deserialize data: {0}")]
    Deserialize(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    pub(crate) fn http_error<E: std::error::Error>(e: E) -> Self {
        Self::Http(format!("{}", e))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialize(format!("{}", e))
    }
}

/// Raw response handed back by an [`HttpBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A basic HTTP interface that [`Client`] backends must implement.
///
/// Authentication, cookies and connection pooling are the backend's business.
#[async_trait]
pub trait HttpBackend: Send {
    /// Perform an HTTP `GET` on the given URL.
    async fn get(&mut self, url: &str) -> Result<HttpResponse, ClientError>;

    /// Perform an HTTP `POST` of a JSON body on the given URL.
    async fn post(&mut self, url: &str, body: Vec<u8>) -> Result<HttpResponse, ClientError>;
}

/// The service endpoints the computation lifecycle relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComputationApi: Send {
    /// `POST /computation`
    async fn post_computation(
        &mut self,
        definition: &ComputationDefinition,
    ) -> Result<Computation, ClientError>;

    /// `POST /projects/{id}/computation`
    async fn post_project_computation(
        &mut self,
        project_id: &str,
        definition: &ComputationDefinition,
    ) -> Result<Computation, ClientError>;

    /// `GET /computation/{id}`
    async fn get_computation(&mut self, id: &str) -> Result<Computation, ClientError>;

    /// `GET /results/{id}`
    async fn get_result(&mut self, id: &str) -> Result<ResultEntity, ClientError>;

    /// `GET /dataobjects/{id}`
    async fn get_data_object(&mut self, id: &str) -> Result<DataObject, ClientError>;

    /// `GET /dataobjects/{id}/data`
    async fn get_data_object_content(&mut self, id: &str) -> Result<Content, ClientError>;
}

#[derive(Debug, Clone)]
/// A client that talks to the computation service via HTTP(S).
pub struct Client<C> {
    /// HTTP(S) backend
    backend: C,
    /// Service URL
    base_url: Url,
}

impl<C> Client<C>
where
    C: HttpBackend,
{
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// An error is returned if `base_url` is not a valid base URL.
    pub fn new(backend: C, base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl(format!("{}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(String::from(
                "cannot be a base URL",
            )));
        }
        Ok(Self { backend, base_url })
    }

    /// Append the given segments to the client base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T>(&mut self, url: Url) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", url);
        let response = self.backend.get(url.as_str()).await?;
        parse_response(response)
    }

    async fn post<T>(&mut self, url: Url, body: &ComputationDefinition) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let body = serde_json::to_vec(body)?;
        let response = self.backend.post(url.as_str(), body).await?;
        parse_response(response)
    }
}

/// Map a response to its payload or to the error the service expressed.
fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ClientError> {
    match response.status {
        200 | 201 => Ok(serde_json::from_slice(&response.body)?),
        403 => {
            let payload = serde_json::from_slice(&response.body).unwrap_or_else(|_| {
                ForbiddenPayload {
                    code: None,
                    message: String::from_utf8_lossy(&response.body).into_owned(),
                    additional_properties: Map::new(),
                }
            });
            Err(ClientError::Forbidden(payload))
        }
        status @ 400 | status @ 422 | status @ 500 => Err(ClientError::Rejected {
            status,
            message: error_message(&response.body),
        }),
        status => Err(ClientError::UnexpectedResponse {
            status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }),
    }
}

/// The service sends error strings either as JSON strings, as objects with a
/// `message` field, or as plain text.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(message)) => message,
        Ok(Value::Object(object)) => match object.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => Value::Object(object).to_string(),
        },
        _ => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[async_trait]
impl<C> ComputationApi for Client<C>
where
    C: HttpBackend,
{
    async fn post_computation(
        &mut self,
        definition: &ComputationDefinition,
    ) -> Result<Computation, ClientError> {
        let url = self.url(&["computation"]);
        self.post(url, definition).await
    }

    async fn post_project_computation(
        &mut self,
        project_id: &str,
        definition: &ComputationDefinition,
    ) -> Result<Computation, ClientError> {
        let url = self.url(&["projects", project_id, "computation"]);
        self.post(url, definition).await
    }

    async fn get_computation(&mut self, id: &str) -> Result<Computation, ClientError> {
        let url = self.url(&["computation", id]);
        self.get(url).await
    }

    async fn get_result(&mut self, id: &str) -> Result<ResultEntity, ClientError> {
        let url = self.url(&["results", id]);
        self.get(url).await
    }

    async fn get_data_object(&mut self, id: &str) -> Result<DataObject, ClientError> {
        let url = self.url(&["dataobjects", id]);
        self.get(url).await
    }

    async fn get_data_object_content(&mut self, id: &str) -> Result<Content, ClientError> {
        let url = self.url(&["dataobjects", id, "data"]);
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;
    use crate::models::{definition::CollectiveKeyGen, ComputationStatus};

    /// Backend replaying canned responses and recording the requests.
    #[derive(Default)]
    struct Replay {
        responses: VecDeque<HttpResponse>,
        requests: Vec<(&'static str, String, Option<Value>)>,
    }

    impl Replay {
        fn with(mut self, status: u16, body: Value) -> Self {
            self.responses.push_back(HttpResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            });
            self
        }

        fn next(&mut self) -> Result<HttpResponse, ClientError> {
            self.responses
                .pop_front()
                .ok_or_else(|| ClientError::Http("no more responses".into()))
        }
    }

    #[async_trait]
    impl HttpBackend for Replay {
        async fn get(&mut self, url: &str) -> Result<HttpResponse, ClientError> {
            self.requests.push(("GET", url.to_string(), None));
            self.next()
        }

        async fn post(&mut self, url: &str, body: Vec<u8>) -> Result<HttpResponse, ClientError> {
            let body = serde_json::from_slice(&body).unwrap();
            self.requests.push(("POST", url.to_string(), Some(body)));
            self.next()
        }
    }

    fn definition() -> ComputationDefinition {
        CollectiveKeyGen::default().into()
    }

    #[tokio::test]
    async fn post_and_get_computation() {
        let backend = Replay::default()
            .with(201, json!({"id": "c-1", "status": "created"}))
            .with(200, json!({"id": "c-1", "status": "success", "results": ["do-1"]}));
        let mut client = Client::new(backend, "http://localhost:8080/api/").unwrap();

        let created = client
            .post_project_computation("p-1", &definition())
            .await
            .unwrap();
        assert_eq!(created.status, ComputationStatus::Created);
        let refreshed = client.get_computation("c-1").await.unwrap();
        assert_eq!(refreshed.results, vec!["do-1".to_string()]);

        let requests = &client.backend.requests;
        assert_eq!(requests[0].0, "POST");
        assert_eq!(
            requests[0].1,
            "http://localhost:8080/api/projects/p-1/computation"
        );
        assert_eq!(
            requests[0].2.as_ref().unwrap()["type"],
            json!("collectiveKeyGen")
        );
        assert_eq!(requests[1].1, "http://localhost:8080/api/computation/c-1");
    }

    #[tokio::test]
    async fn content_endpoint() {
        let backend = Replay::default().with(
            200,
            json!({"type": "floatMatrix", "columns": ["x"], "data": [[1.5]]}),
        );
        let mut client = Client::new(backend, "http://localhost:8080").unwrap();
        let content = client.get_data_object_content("do-1").await.unwrap();
        assert_eq!(content.as_float_matrix().unwrap().first_value(), Some(1.5));
        assert_eq!(
            client.backend.requests[0].1,
            "http://localhost:8080/dataobjects/do-1/data"
        );
    }

    #[tokio::test]
    async fn string_errors_are_rejections() {
        let backend = Replay::default()
            .with(422, json!("missing aggregate columns"))
            .with(500, json!({"message": "database unavailable"}));
        let mut client = Client::new(backend, "http://localhost:8080").unwrap();
        assert_eq!(
            client.post_computation(&definition()).await.unwrap_err(),
            ClientError::Rejected {
                status: 422,
                message: "missing aggregate columns".into()
            }
        );
        assert_eq!(
            client.get_computation("c-1").await.unwrap_err(),
            ClientError::Rejected {
                status: 500,
                message: "database unavailable".into()
            }
        );
    }

    #[tokio::test]
    async fn forbidden_is_structured() {
        let backend = Replay::default().with(
            403,
            json!({"code": "NOT_AUTHORIZED", "message": "not a participant"}),
        );
        let mut client = Client::new(backend, "http://localhost:8080").unwrap();
        match client.get_result("r-1").await.unwrap_err() {
            ClientError::Forbidden(payload) => {
                assert_eq!(payload.code.as_deref(), Some("NOT_AUTHORIZED"));
                assert_eq!(payload.to_string(), "not a participant (NOT_AUTHORIZED)");
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[tokio::test]
    async fn other_statuses_and_bad_bodies() {
        let backend = Replay::default()
            .with(404, json!("not found"))
            .with(200, json!({"unexpected": true}));
        let mut client = Client::new(backend, "http://localhost:8080").unwrap();
        assert!(matches!(
            client.get_data_object("do-1").await.unwrap_err(),
            ClientError::UnexpectedResponse { status: 404, .. }
        ));
        assert!(matches!(
            client.get_data_object("do-1").await.unwrap_err(),
            ClientError::Deserialize(_)
        ));
    }

    #[test]
    fn invalid_base_url() {
        assert!(Client::new(Replay::default(), "not a url").is_err());
        assert!(Client::new(Replay::default(), "mailto:me@example.com").is_err());
    }
}
