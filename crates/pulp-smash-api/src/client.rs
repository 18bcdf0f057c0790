//! HTTP client bound to a Pulp server.

use async_trait::async_trait;
use bytes::Bytes;
use pulp_smash_config::{ServerConfig, Verify};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::check::{check_call_report, check_tasks};
use crate::error::ApiError;
use crate::fetch::TaskFetcher;
use crate::poll::{PollPolicy, TaskPoller};
use crate::task::{CallReport, TaskRef, TaskState};

/// How a [`Client`] treats a response before handing it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseHandler {
  /// Return the response as received.
  Echo,
  /// Fail on 4xx/5xx. On 202, wait for every spawned task and fail if the
  /// call report or any task report carries an error.
  #[default]
  Safe,
  /// Like `Safe`, and additionally require a JSON body.
  Json,
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct Response {
  method: Method,
  url: Url,
  status: StatusCode,
  headers: HeaderMap,
  body: Bytes,
  tasks: Vec<TaskState>,
}

impl Response {
  pub fn method(&self) -> &Method {
    &self.method
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  pub fn status(&self) -> StatusCode {
    self.status
  }

  pub fn headers(&self) -> &HeaderMap {
    &self.headers
  }

  pub fn body(&self) -> &Bytes {
    &self.body
  }

  /// Terminal states of the tasks spawned by this request, in pre-order.
  ///
  /// Empty unless the request was handled with `Safe` or `Json` and the
  /// server answered 202.
  pub fn tasks(&self) -> &[TaskState] {
    &self.tasks
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }

  pub fn json(&self) -> Result<Value, ApiError> {
    self.json_as()
  }

  pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
    serde_json::from_slice(&self.body).map_err(|source| ApiError::Decode {
      url: self.url.to_string(),
      source,
    })
  }

  /// Fail if the status is in the 4xx or 5xx range.
  pub fn error_for_status(&self) -> Result<(), ApiError> {
    if self.status.is_client_error() || self.status.is_server_error() {
      return Err(ApiError::Status {
        method: self.method.to_string(),
        url: self.url.to_string(),
        status: self.status,
      });
    }
    Ok(())
  }

  fn has_json_content_type(&self) -> bool {
    self
      .headers
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v.starts_with("application/json"))
  }
}

/// A client for one Pulp server.
///
/// Paths passed to the request methods are joined onto the configured base
/// URL, so the absolute `_href` paths returned by Pulp can be used directly.
pub struct Client {
  http: reqwest::Client,
  config: ServerConfig,
  handler: ResponseHandler,
  poll_policy: PollPolicy,
}

impl Client {
  /// Create a client using the `Safe` handler and the default poll policy.
  ///
  /// Fails if `config` does not validate.
  pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
    config.validate()?;

    let mut builder = reqwest::Client::builder();
    match &config.verify {
      Verify::Enabled(true) => {}
      Verify::Enabled(false) => {
        builder = builder.danger_accept_invalid_certs(true);
      }
      Verify::CaBundle(path) => {
        let pem = std::fs::read(path)?;
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
      }
    }

    Ok(Self {
      http: builder.build()?,
      config,
      handler: ResponseHandler::default(),
      poll_policy: PollPolicy::default(),
    })
  }

  pub fn with_handler(mut self, handler: ResponseHandler) -> Self {
    self.handler = handler;
    self
  }

  pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
    self.poll_policy = policy;
    self
  }

  pub fn config(&self) -> &ServerConfig {
    &self.config
  }

  pub fn handler(&self) -> ResponseHandler {
    self.handler
  }

  pub fn poll_policy(&self) -> PollPolicy {
    self.poll_policy
  }

  /// Resolve `path` against the base URL.
  pub fn url(&self, path: &str) -> Result<Url, ApiError> {
    Ok(self.config.base_url.join(path)?)
  }

  pub async fn get(&self, path: &str) -> Result<Response, ApiError> {
    self.request(Method::GET, path, None).await
  }

  pub async fn head(&self, path: &str) -> Result<Response, ApiError> {
    self.request(Method::HEAD, path, None).await
  }

  pub async fn options(&self, path: &str) -> Result<Response, ApiError> {
    self.request(Method::OPTIONS, path, None).await
  }

  pub async fn delete(&self, path: &str) -> Result<Response, ApiError> {
    self.request(Method::DELETE, path, None).await
  }

  pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Response, ApiError> {
    self.request(Method::POST, path, body).await
  }

  pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<Response, ApiError> {
    self.request(Method::PUT, path, body).await
  }

  pub async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Response, ApiError> {
    self.request(Method::PATCH, path, body).await
  }

  /// Send a request using the client's handler.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
  ) -> Result<Response, ApiError> {
    self.request_with(self.handler, method, path, body).await
  }

  /// Send a request, overriding the client's handler for this call only.
  #[instrument(
    name = "api_request",
    skip(self, handler, method, body),
    fields(method = %method)
  )]
  pub async fn request_with(
    &self,
    handler: ResponseHandler,
    method: Method,
    path: &str,
    body: Option<&Value>,
  ) -> Result<Response, ApiError> {
    let mut response = self.send(method, self.url(path)?, body).await?;

    match handler {
      ResponseHandler::Echo => {}
      ResponseHandler::Safe => self.handle_accepted(&mut response).await?,
      ResponseHandler::Json => {
        self.handle_accepted(&mut response).await?;
        response.json()?;
      }
    }

    Ok(response)
  }

  async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Response, ApiError> {
    let mut request = self.http.request(method.clone(), url.clone());
    if let Some((username, password)) = &self.config.auth {
      request = request.basic_auth(username, Some(password));
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let raw = request.send().await?;
    let status = raw.status();
    let headers = raw.headers().clone();
    let body = raw.bytes().await?;

    debug!(url = %url, status = %status, bytes = body.len(), "api_response");

    Ok(Response {
      method,
      url,
      status,
      headers,
      body,
      tasks: Vec::new(),
    })
  }

  /// Check the status and, on 202, wait for and check every spawned task.
  async fn handle_accepted(&self, response: &mut Response) -> Result<(), ApiError> {
    response.error_for_status()?;
    if response.status != StatusCode::ACCEPTED {
      return Ok(());
    }

    if !response.has_json_content_type() {
      warn!(
        method = %response.method,
        url = %response.url,
        content_type = ?response.headers.get(CONTENT_TYPE),
        "http_202_without_json_content_type"
      );
    }

    let report: CallReport = response.json_as()?;
    let tasks = TaskPoller::for_call_report(self, &report, self.poll_policy)
      .collect_all()
      .await?;
    check_call_report(&report)?;
    check_tasks(&tasks)?;

    response.tasks = tasks;
    Ok(())
  }
}

#[async_trait]
impl TaskFetcher for Client {
  async fn fetch(&self, task: &TaskRef) -> Result<TaskState, ApiError> {
    let response = self.send(Method::GET, self.url(&task.href)?, None).await?;
    response.error_for_status()?;
    response.json_as()
  }
}
