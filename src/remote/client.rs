use crate::error::{KuperError, Result};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const PER_PAGE: &str = "100";

pub type Query = Vec<(String, String)>;

/// Build a query list from borrowed pairs.
pub fn query<const N: usize>(pairs: [(&str, String); N]) -> Query {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    /// Value of the `X-Next-Page` header, when non-empty.
    pub next_page: Option<String>,
    /// Target of the `rel="next"` entry of the `Link` header.
    pub next_link: Option<String>,
}

/// A single blocking GET. Implementations map network failures and timeouts
/// to [`KuperError::Transport`] and non-2xx statuses to [`KuperError::Api`].
pub trait Transport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response>;
}

pub struct HttpTransport {
    agent: ureq::Agent,
    token: String,
}

impl HttpTransport {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("kuper/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            token: token.into(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response> {
        let mut request = self.agent.get(url).set("PRIVATE-TOKEN", &self.token);
        for (key, value) in query {
            request = request.query(key, value);
        }

        tracing::debug!("GET {url} {query:?}");
        match request.call() {
            Ok(response) => {
                let status = response.status();
                let next_page = response
                    .header("X-Next-Page")
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from);
                let next_link = response.header("Link").and_then(parse_next_link);
                // `into_string` caps bodies at 10 MB; large diffs exceed that.
                let mut body = String::new();
                response
                    .into_reader()
                    .read_to_string(&mut body)
                    .map_err(|e| KuperError::Transport {
                        url: url.to_string(),
                        message: format!("failed to read body: {e}"),
                    })?;
                Ok(Response {
                    status,
                    body,
                    next_page,
                    next_link,
                })
            }
            Err(ureq::Error::Status(status, response)) => Err(KuperError::Api {
                status,
                url: url.to_string(),
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(KuperError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(String::from)
    })
}

/// Cooperative cancellation shared between an embedding caller and the client.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct RemoteClient {
    transport: Box<dyn Transport>,
    api_root: String,
    cancel: CancelToken,
}

impl RemoteClient {
    /// `instance` is the server base URL, e.g. `https://gitlab.com`.
    pub fn new(transport: impl Transport + 'static, instance: &str) -> Self {
        Self {
            transport: Box::new(transport),
            api_root: format!("{}/api/v4", instance.trim_end_matches('/')),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    fn send(&self, url: &str, query: &[(String, String)]) -> Result<Response> {
        if self.cancel.is_cancelled() {
            return Err(KuperError::Cancelled);
        }
        self.transport.get(url, query)
    }

    pub fn get(&self, path: &str, query: &[(String, String)]) -> Result<Response> {
        self.send(&self.url(path), query)
    }

    pub fn get_json<D: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<D> {
        let url = self.url(path);
        let response = self.send(&url, query)?;
        decode(&url, &response.body)
    }

    /// Lazily walk every page of a listing endpoint.
    pub fn pages(&self, path: &str, query: &[(String, String)]) -> Pages<'_> {
        let mut query = query.to_vec();
        if !query.iter().any(|(k, _)| k == "per_page") {
            query.push(("per_page".to_string(), PER_PAGE.to_string()));
        }
        Pages {
            client: self,
            url: self.url(path),
            query,
            next: Some(NextRequest::First),
        }
    }

    /// Concatenate the JSON arrays of every page into one list.
    pub fn get_all<D: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<Vec<D>> {
        let mut items = Vec::new();
        let url = self.url(path);
        for page in self.pages(path, query) {
            let page = page?;
            let batch: Vec<D> = decode(&url, &page.body)?;
            items.extend(batch);
        }
        Ok(items)
    }
}

fn decode<D: DeserializeOwned>(url: &str, body: &str) -> Result<D> {
    serde_json::from_str(body).map_err(|source| KuperError::Decode {
        url: url.to_string(),
        source,
    })
}

enum NextRequest {
    First,
    Link(String),
    Page(String),
}

/// Iterator over the pages of a listing. Stops after the first error or when
/// the provider signals no further page.
pub struct Pages<'a> {
    client: &'a RemoteClient,
    url: String,
    query: Query,
    next: Option<NextRequest>,
}

impl Iterator for Pages<'_> {
    type Item = Result<Response>;

    fn next(&mut self) -> Option<Self::Item> {
        let request = self.next.take()?;
        let result = match request {
            NextRequest::First => self.client.send(&self.url, &self.query),
            // Continuation links already carry the full query.
            NextRequest::Link(url) => self.client.send(&url, &[]),
            NextRequest::Page(page) => {
                let mut query: Query = self.query.iter().filter(|(k, _)| k != "page").cloned().collect();
                query.push(("page".to_string(), page));
                self.client.send(&self.url, &query)
            }
        };

        if let Ok(response) = &result {
            self.next = match (&response.next_link, &response.next_page) {
                (Some(link), _) => Some(NextRequest::Link(link.clone())),
                (None, Some(page)) => Some(NextRequest::Page(page.clone())),
                (None, None) => None,
            };
        }
        Some(result)
    }
}
