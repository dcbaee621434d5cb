pub mod client;
pub mod fake;
pub mod gitlab;
pub mod types;

pub use client::{CancelToken, HttpTransport, RemoteClient, Response, Transport, DEFAULT_TIMEOUT};
pub use gitlab::GitLab;
