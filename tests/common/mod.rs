#![allow(dead_code)]

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use kuper::error::KuperError;
use kuper::remote::fake::FakeTransport;
use kuper::remote::Transport;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

pub use kuper::remote::fake::Reply;

pub const ME: &str = "me@example.com";

pub fn hours_ago(hours: i64) -> String {
    ts(Utc::now() - Duration::hours(hours))
}

pub fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn user_json(username: &str, email: &str) -> String {
    format!(r#"{{"id": 42, "username": "{username}", "email": "{email}"}}"#)
}

pub fn project_json(id: u64, path: &str) -> String {
    format!(r#"{{"id": {id}, "path_with_namespace": "{path}"}}"#)
}

pub fn push_json(project_id: u64, branch: &str, created_at: &str) -> String {
    format!(
        r#"{{"project_id": {project_id}, "action_name": "pushed to", "created_at": "{created_at}",
            "push_data": {{"ref": "{branch}", "ref_type": "branch", "action": "pushed"}}}}"#
    )
}

pub fn commit_json(short_id: &str, email: &str, created_at: &str, title: &str) -> String {
    format!(
        r#"{{"id": "{short_id}0123456789", "short_id": "{short_id}", "title": "{title}",
            "message": "{title}\n", "author_email": "{email}", "created_at": "{created_at}",
            "web_url": "https://git.example.com/-/commit/{short_id}0123456789"}}"#
    )
}

pub fn array(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// Serve `fake` over HTTP on a local port; returns the instance base URL.
/// Requests answered with `Reply::Timeout` get the connection dropped. The
/// server thread lives until the test process exits.
pub fn serve(fake: FakeTransport) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let origin = base.clone();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Ok(reader_stream) = stream.try_clone() else { continue };
            let mut reader = BufReader::new(reader_stream);

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" || header == "\n" => break,
                    Ok(_) => {}
                }
            }

            let target = request_line.split_whitespace().nth(1).unwrap_or("/");
            let (path, raw_query) = target.split_once('?').unwrap_or((target, ""));
            let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw_query.as_bytes())
                .into_owned()
                .collect();

            let (status, body, next_page) = match fake.get(&format!("{origin}{path}"), &pairs) {
                Ok(response) => (response.status, response.body, response.next_page),
                Err(KuperError::Api { status, body, .. }) => (status, body, None),
                Err(_) => continue,
            };
            let reason = if status < 300 { "OK" } else { "Error" };
            let next_page = next_page
                .map(|page| format!("X-Next-Page: {page}\r\n"))
                .unwrap_or_default();
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n{next_page}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    base
}
