//! In-memory transport answering from a route table.

use super::client::{Response, Transport};
use crate::error::{KuperError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Response),
    Status(u16),
    Timeout,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Reply::Ok(Response {
            status: 200,
            body: body.to_string(),
            next_page: None,
            next_link: None,
        })
    }

    pub fn status(status: u16) -> Self {
        Reply::Status(status)
    }

    pub fn next_page(self, page: &str) -> Self {
        match self {
            Reply::Ok(mut r) => {
                r.next_page = Some(page.to_string());
                Reply::Ok(r)
            }
            other => other,
        }
    }

    pub fn next_link(self, link: &str) -> Self {
        match self {
            Reply::Ok(mut r) => {
                r.next_link = Some(link.to_string());
                Reply::Ok(r)
            }
            other => other,
        }
    }
}

#[derive(Debug)]
struct Route {
    path: String,
    query: Vec<(String, String)>,
    reply: Reply,
}

/// Clones share the route table and the call log, so one handle can be given
/// to a client while another inspects the calls.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes are tried in insertion order; the first whose path equals the
    /// request path (below `/api/v4`) and whose query pairs are all present wins.
    pub fn route(self, path: &str, query: &[(&str, &str)], reply: Reply) -> Self {
        lock(&self.routes).push(Route {
            path: path.to_string(),
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            reply,
        });
        self
    }

    /// Every request seen so far, rendered as `url?k=v&...`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response> {
        let (base, inline) = url.split_once('?').unwrap_or((url, ""));
        let mut pairs: Vec<(String, String)> = inline
            .split('&')
            .filter_map(|kv| kv.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.extend(query.iter().cloned());

        let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        lock(&self.calls).push(format!("{base}?{}", rendered.join("&")));

        let path = base.split_once("/api/v4").map(|(_, p)| p).unwrap_or(base);
        let reply = lock(&self.routes)
            .iter()
            .find(|r| r.path == path && r.query.iter().all(|q| pairs.contains(q)))
            .map(|r| r.reply.clone());

        match reply {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Status(status)) => Err(KuperError::Api {
                status,
                url: url.to_string(),
                body: String::new(),
            }),
            Some(Reply::Timeout) => Err(KuperError::Transport {
                url: url.to_string(),
                message: "timed out".to_string(),
            }),
            None => Err(KuperError::Api {
                status: 404,
                url: url.to_string(),
                body: "no route".to_string(),
            }),
        }
    }
}
