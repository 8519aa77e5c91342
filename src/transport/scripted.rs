//! In-memory backend answering from per-route scripts

use super::backend::{HttpBackend, HttpRequest, HttpResponse};
use super::request::Method;
use crate::error::{StorefrontError, StorefrontResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum Reply {
    Respond { status: u16, body: String },
    Fail(String),
}

/// Backend for tests: each `METHOD path` route holds a queue of replies.
///
/// Replies are consumed in order; the last one repeats for any further
/// request to the same route. Unscripted routes answer 404.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn route_key(method: Method, path: &str) -> String {
    format!("{} {}", method, path)
}

/// Path component of an absolute URL, without the query string
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = rest.find('/').map(|i| &rest[i..]).unwrap_or("/");
    path.split('?').next().unwrap_or(path)
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        lock(&self.routes)
            .entry(route_key(method, path))
            .or_default()
            .push_back(reply);
    }

    /// Queue a JSON reply for `method path`
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.push(method, path, Reply::Respond { status, body });
        self
    }

    /// Queue a transport failure for `method path`
    pub fn fail(&self, method: Method, path: &str, reason: &str) -> &Self {
        self.push(method, path, Reply::Fail(reason.to_string()));
        self
    }

    /// Every request executed so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.seen).clone()
    }

    /// Requests executed against `method path`
    pub fn calls(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        lock(&self.seen)
            .iter()
            .filter(|r| r.method == method && url_path(&r.url) == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn execute(&self, request: HttpRequest) -> StorefrontResult<HttpResponse> {
        let key = route_key(request.method, url_path(&request.url));
        let url = request.url.clone();
        lock(&self.seen).push(request);

        let reply = {
            let mut routes = lock(&self.routes);
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Respond { status, body }) => Ok(HttpResponse { status, body }),
            Some(Reply::Fail(reason)) => Err(StorefrontError::network(url, reason)),
            None => Ok(HttpResponse {
                status: 404,
                body: r#"{"detail": "Not found."}"#.to_string(),
            }),
        }
    }
}
