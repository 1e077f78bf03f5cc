use async_trait::async_trait;
use ::reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    ClientBuilder,
};

use super::{Client, ClientError, HttpBackend, HttpResponse};

/// Build a [`Client`] backed by `reqwest`.
///
/// # Args
///
/// - `address`: URL of the computation service API
/// - `token`: bearer token attached to every request, if any
pub fn new_client(
    address: &str,
    token: Option<&str>,
) -> Result<Client<::reqwest::Client>, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(ClientError::http_error)?;
        headers.insert(AUTHORIZATION, value);
    }
    let backend = ClientBuilder::new()
        .use_rustls_tls()
        .default_headers(headers)
        .build()
        .map_err(ClientError::http_error)?;
    Client::new(backend, address)
}

#[async_trait]
impl HttpBackend for ::reqwest::Client {
    async fn get(&mut self, url: &str) -> Result<HttpResponse, ClientError> {
        let response = ::reqwest::Client::get(self, url)
            .send()
            .await
            .map_err(ClientError::http_error)?;
        into_http_response(response).await
    }

    async fn post(&mut self, url: &str, body: Vec<u8>) -> Result<HttpResponse, ClientError> {
        let response = ::reqwest::Client::post(self, url)
            .body(body)
            .send()
            .await
            .map_err(ClientError::http_error)?;
        into_http_response(response).await
    }
}

async fn into_http_response(response: ::reqwest::Response) -> Result<HttpResponse, ClientError> {
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(ClientError::http_error)?;
    Ok(HttpResponse {
        status,
        body: body.to_vec(),
    })
}
