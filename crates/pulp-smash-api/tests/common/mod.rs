//! A scripted Pulp server for exercising the client end to end.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use pulp_smash_config::ServerConfig;
use serde_json::Value;
use tokio::net::TcpListener;
use url::Url;

/// A canned response.
#[derive(Debug, Clone)]
pub struct Reply {
  pub status: u16,
  pub content_type: &'static str,
  pub body: String,
}

impl Reply {
  pub fn json(status: u16, body: Value) -> Self {
    Self {
      status,
      content_type: "application/json",
      body: body.to_string(),
    }
  }

  pub fn text(status: u16, body: &str) -> Self {
    Self {
      status,
      content_type: "text/plain",
      body: body.to_string(),
    }
  }
}

impl IntoResponse for Reply {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.status).unwrap();
    (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
  }
}

/// What the server saw.
#[derive(Debug, Clone)]
pub struct Recorded {
  pub method: String,
  pub path: String,
  pub authorization: Option<String>,
  pub body: String,
}

#[derive(Default)]
struct Script {
  routes: Mutex<HashMap<(String, String), VecDeque<Reply>>>,
  requests: Mutex<Vec<Recorded>>,
}

/// Serves scripted replies per `(method, path)`. The last reply of a route
/// repeats forever; unknown routes get a 404.
pub struct FakeServer {
  addr: SocketAddr,
  script: Arc<Script>,
}

impl FakeServer {
  pub async fn start() -> Self {
    let script = Arc::new(Script::default());
    let router = Router::new()
      .fallback(scripted_reply)
      .with_state(script.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });

    Self { addr, script }
  }

  pub fn route(&self, method: &str, path: &str, replies: Vec<Reply>) {
    self
      .script
      .routes
      .lock()
      .unwrap()
      .insert((method.to_string(), path.to_string()), replies.into());
  }

  pub fn config(&self) -> ServerConfig {
    ServerConfig::new(Url::parse(&format!("http://{}", self.addr)).unwrap())
  }

  pub fn requests(&self) -> Vec<Recorded> {
    self.script.requests.lock().unwrap().clone()
  }

  pub fn hits(&self, method: &str, path: &str) -> usize {
    self
      .requests()
      .iter()
      .filter(|r| r.method == method && r.path == path)
      .count()
  }
}

async fn scripted_reply(
  State(script): State<Arc<Script>>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  body: String,
) -> Reply {
  let method = method.as_str().to_string();
  let path = uri.path().to_string();

  script.requests.lock().unwrap().push(Recorded {
    method: method.clone(),
    path: path.clone(),
    authorization: headers
      .get(header::AUTHORIZATION)
      .and_then(|value| value.to_str().ok())
      .map(str::to_string),
    body,
  });

  let mut routes = script.routes.lock().unwrap();
  match routes.get_mut(&(method, path)) {
    Some(queue) if queue.len() > 1 => queue.pop_front(),
    Some(queue) => queue.front().cloned(),
    None => None,
  }
  .unwrap_or_else(|| Reply::text(404, "not found"))
}
